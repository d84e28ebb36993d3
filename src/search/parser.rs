//! Smart-search query language
//!
//! A query is a whitespace separated list of tokens. Each token is either
//! `CODE:value`, addressing the source field with that code, or a bare
//! `value` attributed to the first field of the source. A leading `!` on the
//! value (or on the code) negates the token when the field allows it.
//!
//! ```text
//! ON:Apollo !MN:12345 bangalore
//! ```

use crate::domain::{
    AutoCompleteSearchString, ConditionalOperator, SearchFieldConfig, SearchSourceConfig,
};

const NEGATION: char = '!';
const CODE_SEPARATOR: char = ':';

/// Parse `query` into structured filters for `source`.
///
/// Tokens with an unknown code, or with nothing left after stripping the
/// negation marker, are dropped. Every token yields at most one filter.
pub fn parse_query(query: &str, source: &SearchSourceConfig) -> Vec<AutoCompleteSearchString> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    query
        .split_whitespace()
        .filter_map(|token| parse_token(token, source))
        .collect()
}

fn parse_token(token: &str, source: &SearchSourceConfig) -> Option<AutoCompleteSearchString> {
    let (field, raw) = match token.find(CODE_SEPARATOR) {
        Some(idx) if idx > 0 => {
            let code = &token[..idx];
            let rest = &token[idx + CODE_SEPARATOR.len_utf8()..];
            match code.strip_prefix(NEGATION) {
                // `!CODE:value` reads as `CODE:!value`
                Some(code) => (resolve_code(code, source)?, format!("{}{}", NEGATION, rest)),
                None => (resolve_code(code, source)?, rest.to_string()),
            }
        }
        _ => (source.fields.first()?, token.to_string()),
    };

    build_filter(field, &raw)
}

fn resolve_code<'a>(code: &str, source: &'a SearchSourceConfig) -> Option<&'a SearchFieldConfig> {
    let field = source.field_by_code(code);
    if field.is_none() {
        tracing::debug!("Dropping query token with unknown code '{}'", code);
    }
    field
}

fn build_filter(field: &SearchFieldConfig, raw: &str) -> Option<AutoCompleteSearchString> {
    let raw = raw.trim();
    let (conditional_operator, value) = match raw.strip_prefix(NEGATION) {
        Some(rest) if field.allow_not => (ConditionalOperator::Not, rest.trim()),
        _ => (ConditionalOperator::And, raw),
    };
    if value.is_empty() {
        return None;
    }

    Some(AutoCompleteSearchString {
        parameter_name: field.parameter_name.clone(),
        parameter_code: field.code.clone(),
        conditional_operator,
        wildcard_operator: field.default_wildcard.unwrap_or_default(),
        parameter_value: value.to_string(),
    })
}
