use std::collections::HashMap;
use thiserror::Error;

use crate::config::{CatalogConfig, Settings};
use crate::domain::SearchSourceConfig;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_timings(settings) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_sources(&settings.sources) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_catalogs(&settings.catalogs) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_timings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if settings.search.debounce_ms == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "search.debounce_ms".to_string(),
                reason: "Debounce must be greater than 0".to_string(),
            });
        }

        let timeouts = [
            ("search.timeout_ms", settings.search.timeout_ms),
            ("options.timeout_ms", settings.options.timeout_ms),
        ];
        for (field, timeout) in timeouts {
            if timeout == Some(0) {
                errors.push(ValidationError::InvalidValue {
                    field: field.to_string(),
                    reason: "Timeout must be greater than 0 when set".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_sources(sources: &[SearchSourceConfig]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut seen_keys = HashMap::new();

        for (idx, source) in sources.iter().enumerate() {
            if let Some(prev_idx) = seen_keys.insert(&source.key, idx) {
                errors.push(ValidationError::Duplicate(format!(
                    "Source key '{}' appears at indices {} and {}",
                    source.key, prev_idx, idx
                )));
            }

            if source.key.is_empty() {
                errors.push(ValidationError::MissingField(format!("sources[{}].key", idx)));
            }

            if source.fields.is_empty() {
                errors.push(ValidationError::InvalidValue {
                    field: format!("sources[{}].fields", idx),
                    reason: format!("Source '{}' declares no search fields", source.key),
                });
            }

            let mut seen_codes = HashMap::new();
            for (field_idx, field) in source.fields.iter().enumerate() {
                if field.code.trim().is_empty() {
                    errors.push(ValidationError::MissingField(format!(
                        "sources[{}].fields[{}].code",
                        idx, field_idx
                    )));
                } else if let Some(prev_idx) =
                    seen_codes.insert(field.code.to_ascii_uppercase(), field_idx)
                {
                    errors.push(ValidationError::Duplicate(format!(
                        "Field code '{}' in source '{}' appears at indices {} and {}",
                        field.code, source.key, prev_idx, field_idx
                    )));
                }

                if field.parameter_name.trim().is_empty() {
                    errors.push(ValidationError::MissingField(format!(
                        "sources[{}].fields[{}].parameterName",
                        idx, field_idx
                    )));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_catalogs(catalogs: &[CatalogConfig]) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = catalogs
            .iter()
            .enumerate()
            .filter(|(_, catalog)| catalog.endpoint.is_empty())
            .map(|(idx, _)| ValidationError::MissingField(format!("catalogs[{}].endpoint", idx)))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SearchFieldConfig;

    fn valid_source(key: &str) -> SearchSourceConfig {
        SearchSourceConfig::new(key, "org/search")
            .with_field(SearchFieldConfig::new("ON", "org_name"))
            .with_field(SearchFieldConfig::new("MN", "mobile_no"))
    }

    #[test]
    fn test_valid_settings() {
        let settings = Settings {
            sources: vec![valid_source("orgs"), valid_source("people")],
            ..Default::default()
        };
        assert!(ConfigValidator::validate(&settings).is_ok());
    }

    #[test]
    fn test_zero_timings() {
        let mut settings = Settings::default();
        settings.search.debounce_ms = 0;
        settings.search.timeout_ms = Some(0);
        settings.options.timeout_ms = Some(0);

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].to_string().contains("search.debounce_ms"));
    }

    #[test]
    fn test_duplicate_source_keys() {
        let settings = Settings {
            sources: vec![valid_source("orgs"), valid_source("orgs")],
            ..Default::default()
        };

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::Duplicate(_)));
    }

    #[test]
    fn test_source_without_fields() {
        let settings = Settings {
            sources: vec![SearchSourceConfig::new("bare", "bare")],
            ..Default::default()
        };

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn test_field_codes_are_checked_case_insensitively() {
        let source = SearchSourceConfig::new("orgs", "org/search")
            .with_field(SearchFieldConfig::new("on", "org_name"))
            .with_field(SearchFieldConfig::new("ON", "owner_name"))
            .with_field(SearchFieldConfig::new(" ", "blank"))
            .with_field(SearchFieldConfig::new("CT", ""));
        let settings = Settings {
            sources: vec![source],
            ..Default::default()
        };

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(errors.len(), 3);
        assert!(messages.iter().any(|m| m.contains("Field code 'ON'")));
        assert!(messages.iter().any(|m| m.contains("fields[2].code")));
        assert!(messages.iter().any(|m| m.contains("fields[3].parameterName")));
    }

    #[test]
    fn test_catalog_without_endpoint() {
        let settings = Settings {
            catalogs: vec![CatalogConfig {
                endpoint: String::new(),
                records: vec![],
            }],
            ..Default::default()
        };
        assert!(ConfigValidator::validate(&settings).is_err());
    }
}
