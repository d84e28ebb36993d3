//! Validator composition from declarative rules
//!
//! Every validator except `Required` passes on an empty value, so optional
//! fields stay valid until the user types something.

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

use super::error::ValidationError;
use crate::domain::{FieldDefinition, FieldType};

const EMAIL_PATTERN: &str = r#"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"#;
const EMAIL_MAX_LENGTH: usize = 254;
const EMAIL_LOCAL_MAX_LENGTH: usize = 64;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"))
}

/// Whether a value counts as "not filled in"
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

// ============================================================================
// Bounds
// ============================================================================

/// Numeric or date bound for `min`/`max` rules
#[derive(Clone, Debug, PartialEq)]
pub enum Bound {
    Number(f64),
    Date(NaiveDate),
}

impl Bound {
    /// Coerce a declared bound. Returns `None` when the bound is neither a
    /// finite number nor a date, in which case the rule is dropped.
    pub fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(Bound::Number),
            Value::String(s) => {
                let s = s.trim();
                match s.parse::<f64>() {
                    Ok(n) if n.is_finite() => Some(Bound::Number(n)),
                    _ => parse_date(s).map(Bound::Date),
                }
            }
            _ => None,
        }
    }

    /// `Some(ordering of value relative to bound)`, or `None` when the value
    /// cannot be compared against this kind of bound.
    fn compare(&self, value: &Value) -> Option<std::cmp::Ordering> {
        match self {
            Bound::Number(bound) => {
                let n = match value {
                    Value::Number(n) => n.as_f64()?,
                    Value::String(s) => s.trim().parse::<f64>().ok()?,
                    _ => return None,
                };
                n.partial_cmp(bound)
            }
            Bound::Date(bound) => {
                let date = parse_date(value.as_str()?.trim())?;
                Some(date.cmp(bound))
            }
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Number(n) => write!(f, "{}", n),
            Bound::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

// ============================================================================
// Validators
// ============================================================================

#[derive(Clone, Debug)]
pub enum Validator {
    Required,
    Email,
    MinLength(usize),
    MaxLength(usize),
    Pattern(Regex),
    Min(Bound),
    Max(Bound),
}

impl Validator {
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        if let Validator::Required = self {
            return if is_empty_value(value) {
                Err(ValidationError::Required)
            } else {
                Ok(())
            };
        }
        if is_empty_value(value) {
            return Ok(());
        }

        match self {
            Validator::Required => Ok(()),
            Validator::Email => {
                let text = value.as_str().unwrap_or_default();
                if is_email(text) {
                    Ok(())
                } else {
                    Err(ValidationError::Email)
                }
            }
            Validator::MinLength(min) => match value_length(value) {
                Some(actual) if actual < *min => Err(ValidationError::MinLength { min: *min, actual }),
                _ => Ok(()),
            },
            Validator::MaxLength(max) => match value_length(value) {
                Some(actual) if actual > *max => Err(ValidationError::MaxLength { max: *max, actual }),
                _ => Ok(()),
            },
            Validator::Pattern(regex) => {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return Ok(()),
                };
                if regex.is_match(&text) {
                    Ok(())
                } else {
                    Err(ValidationError::Pattern(regex.as_str().to_string()))
                }
            }
            Validator::Min(bound) => match bound.compare(value) {
                Some(std::cmp::Ordering::Less) => Err(ValidationError::Min(bound.to_string())),
                _ => Ok(()),
            },
            Validator::Max(bound) => match bound.compare(value) {
                Some(std::cmp::Ordering::Greater) => Err(ValidationError::Max(bound.to_string())),
                _ => Ok(()),
            },
        }
    }
}

fn value_length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

fn is_email(text: &str) -> bool {
    if text.len() > EMAIL_MAX_LENGTH {
        return false;
    }
    match text.split_once('@') {
        Some((local, _)) if local.len() <= EMAIL_LOCAL_MAX_LENGTH => email_regex().is_match(text),
        _ => false,
    }
}

/// Anchor a pattern the way form pattern attributes are matched: the whole value.
fn anchored(pattern: &str) -> String {
    let mut anchored = String::with_capacity(pattern.len() + 2);
    if !pattern.starts_with('^') {
        anchored.push('^');
    }
    anchored.push_str(pattern);
    if !pattern.ends_with('$') {
        anchored.push('$');
    }
    anchored
}

/// Compose the validator chain for a field.
///
/// Rules that cannot be honoured (an uncompilable pattern, a bound that is
/// neither numeric nor a date) are omitted instead of failing the schema.
pub fn compose(field: &FieldDefinition) -> Vec<Validator> {
    let mut validators = Vec::new();
    let rule = field.validation.clone().unwrap_or_default();

    if rule.required {
        validators.push(Validator::Required);
    }
    if rule.email || field.field_type == FieldType::Email {
        validators.push(Validator::Email);
    }
    if let Some(min) = rule.min_length {
        validators.push(Validator::MinLength(min));
    }
    if let Some(max) = rule.max_length {
        validators.push(Validator::MaxLength(max));
    }
    if let Some(pattern) = rule.pattern.as_deref().filter(|p| !p.is_empty()) {
        match Regex::new(&anchored(pattern)) {
            Ok(regex) => validators.push(Validator::Pattern(regex)),
            Err(e) => tracing::warn!("Dropping pattern on field '{}': {}", field.key, e),
        }
    }
    if let Some(bound) = rule.min.as_ref().and_then(Bound::coerce) {
        validators.push(Validator::Min(bound));
    }
    if let Some(bound) = rule.max.as_ref().and_then(Bound::coerce) {
        validators.push(Validator::Max(bound));
    }

    validators
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ValidationRule;
    use serde_json::json;

    fn field_with(rule: ValidationRule) -> FieldDefinition {
        FieldDefinition::new("f", FieldType::Text).with_validation(rule)
    }

    fn errors(validators: &[Validator], value: Value) -> Vec<ValidationError> {
        validators.iter().filter_map(|v| v.validate(&value).err()).collect()
    }

    #[test]
    fn test_required_and_min_length() {
        let validators = compose(&field_with(ValidationRule {
            required: true,
            min_length: Some(3),
            ..Default::default()
        }));

        assert_eq!(errors(&validators, json!("")), vec![ValidationError::Required]);
        assert_eq!(
            errors(&validators, json!("ab")),
            vec![ValidationError::MinLength { min: 3, actual: 2 }]
        );
        assert!(errors(&validators, json!("abc")).is_empty());
    }

    #[test]
    fn test_email_from_type_tag() {
        let validators = compose(&FieldDefinition::new("mail", FieldType::Email));
        assert_eq!(validators.len(), 1);
        assert!(errors(&validators, json!("someone@example.com")).is_empty());
        assert_eq!(errors(&validators, json!("not-an-email")), vec![ValidationError::Email]);
        // Optional email stays valid while empty
        assert!(errors(&validators, Value::Null).is_empty());
    }

    #[test]
    fn test_non_numeric_bound_is_dropped() {
        let validators = compose(&field_with(ValidationRule {
            min: Some(json!("not-a-number")),
            ..Default::default()
        }));

        assert!(validators.is_empty());
        assert!(errors(&validators, json!(-1000)).is_empty());
    }

    #[test]
    fn test_numeric_bounds() {
        let validators = compose(&field_with(ValidationRule {
            min: Some(json!("1")),
            max: Some(json!(10)),
            ..Default::default()
        }));

        assert_eq!(errors(&validators, json!(0)), vec![ValidationError::Min("1".to_string())]);
        assert!(errors(&validators, json!("5")).is_empty());
        assert_eq!(errors(&validators, json!(11)), vec![ValidationError::Max("10".to_string())]);
    }

    #[test]
    fn test_date_bounds() {
        let validators = compose(&field_with(ValidationRule {
            min: Some(json!("2024-01-01")),
            ..Default::default()
        }));

        assert_eq!(validators.len(), 1);
        assert!(errors(&validators, json!("2024-06-30")).is_empty());
        assert!(errors(&validators, json!("2024-06-30T10:00:00Z")).is_empty());
        assert_eq!(
            errors(&validators, json!("2023-12-31")),
            vec![ValidationError::Min("2024-01-01".to_string())]
        );
    }

    #[test]
    fn test_pattern_is_anchored() {
        let validators = compose(&field_with(ValidationRule {
            pattern: Some("[0-9]{5}".to_string()),
            ..Default::default()
        }));

        assert!(errors(&validators, json!("98765")).is_empty());
        assert_eq!(errors(&validators, json!("987654")).len(), 1);
        assert!(errors(&validators, json!(12345)).is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_dropped() {
        let validators = compose(&field_with(ValidationRule {
            pattern: Some("([a-z".to_string()),
            ..Default::default()
        }));
        assert!(validators.is_empty());
    }

    #[test]
    fn test_max_length_counts_chars() {
        let validators = compose(&field_with(ValidationRule {
            max_length: Some(3),
            ..Default::default()
        }));

        assert!(errors(&validators, json!("äöü")).is_empty());
        assert_eq!(
            errors(&validators, json!(["a", "b", "c", "d"])),
            vec![ValidationError::MaxLength { max: 3, actual: 4 }]
        );
    }
}
