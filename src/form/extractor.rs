//! Flattens a schema into its field definitions

use crate::domain::{FieldDefinition, FormSchema, RowConfig};

/// Walk the active rows of a schema (tabs or standard rows) and return every
/// value-holding field in document order.
///
/// Fieldset containers are replaced by their nested fields. Duplicate keys
/// are kept; deduplication is the builder's job.
pub fn extract_fields(schema: &FormSchema) -> Vec<FieldDefinition> {
    let mut fields = Vec::new();
    for row in schema.active_rows() {
        collect_row(row, &mut fields);
    }
    fields
}

fn collect_row(row: &RowConfig, out: &mut Vec<FieldDefinition>) {
    for field in row.columns.iter().filter_map(|c| c.field.as_ref()) {
        if field.field_type.is_container() {
            for nested in field.rows.iter().flatten() {
                collect_row(nested, out);
            }
        } else {
            out.push(field.clone());
        }
    }
}
