//! Error types for the form engine

use thiserror::Error;

/// Errors raised while loading schemas or addressing controls
#[derive(Debug, Error)]
pub enum FormError {
    /// Schema file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Schema document is malformed
    #[error("Schema parse error: {0}")]
    SchemaParse(String),

    /// No control exists for the key
    #[error("Unknown control: {0}")]
    UnknownControl(String),
}

impl From<serde_json::Error> for FormError {
    fn from(err: serde_json::Error) -> Self {
        FormError::SchemaParse(err.to_string())
    }
}

/// A single failed validator on a control
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Value is required")]
    Required,

    #[error("Not a valid email address")]
    Email,

    #[error("Must be at least {min} characters (got {actual})")]
    MinLength { min: usize, actual: usize },

    #[error("Must be at most {max} characters (got {actual})")]
    MaxLength { max: usize, actual: usize },

    #[error("Does not match pattern {0}")]
    Pattern(String),

    #[error("Must be at least {0}")]
    Min(String),

    #[error("Must be at most {0}")]
    Max(String),
}

/// Result type alias for form operations
pub type FormResult<T> = Result<T, FormError>;
