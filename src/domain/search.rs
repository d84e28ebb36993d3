//! Search-source configuration and the structured filter wire format

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Match style applied to a filter value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WildcardOperator {
    #[default]
    Contains,
    StartsWith,
    EndsWith,
    Exact,
    Auto,
}

/// How a filter combines with the others in a request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionalOperator {
    #[default]
    And,
    Not,
    AndNot,
}

impl ConditionalOperator {
    /// Whether matching records are excluded rather than required
    pub fn is_negated(&self) -> bool {
        matches!(self, ConditionalOperator::Not | ConditionalOperator::AndNot)
    }
}

/// One searchable field of a source, addressed in queries by its code
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFieldConfig {
    /// Short code typed by the user, e.g. `ON` in `ON:Apollo`
    pub code: String,
    #[serde(default)]
    pub label: String,
    /// Parameter name sent to the catalog
    pub parameter_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_wildcard: Option<WildcardOperator>,
    /// Whether `!value` negation is honoured for this field
    #[serde(default)]
    pub allow_not: bool,
}

impl SearchFieldConfig {
    pub fn new(code: impl Into<String>, parameter_name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: String::new(),
            parameter_name: parameter_name.into(),
            default_wildcard: None,
            allow_not: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_wildcard(mut self, wildcard: WildcardOperator) -> Self {
        self.default_wildcard = Some(wildcard);
        self
    }

    pub fn allow_not(mut self) -> Self {
        self.allow_not = true;
        self
    }
}

/// Display-only column metadata for result tables
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub key: String,
    #[serde(default)]
    pub header: String,
}

/// Display-only table metadata
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default)]
    pub columns: Vec<TableColumn>,
}

/// Configuration of one searchable catalog
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSourceConfig {
    pub key: String,
    pub endpoint: String,
    /// Ordered; the first entry is the positional default for uncoded tokens
    #[serde(default)]
    pub fields: Vec<SearchFieldConfig>,
    #[serde(default)]
    pub table: TableConfig,
    /// Feature flags, passed through untouched
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub flags: Map<String, Value>,
    /// Filters prepended to every request from this source
    #[serde(default)]
    pub base_filters: Vec<AutoCompleteSearchString>,
}

impl SearchSourceConfig {
    pub fn new(key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, field: SearchFieldConfig) -> Self {
        self.fields.push(field);
        self
    }

    /// Case-insensitive lookup; the first matching code wins.
    pub fn field_by_code(&self, code: &str) -> Option<&SearchFieldConfig> {
        self.fields.iter().find(|f| f.code.eq_ignore_ascii_case(code))
    }
}

/// Structured filter produced by the query parser
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoCompleteSearchString {
    pub parameter_name: String,
    pub parameter_code: String,
    pub conditional_operator: ConditionalOperator,
    pub wildcard_operator: WildcardOperator,
    pub parameter_value: String,
}

impl fmt::Display for AutoCompleteSearchString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.conditional_operator.is_negated() { "!" } else { "" };
        write!(f, "{}{}:{}", prefix, self.parameter_code, self.parameter_value)
    }
}

/// Envelope returned by the search collaborator
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub is_success: bool,
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchResponse {
    pub fn success(data: Vec<Value>) -> Self {
        Self {
            is_success: true,
            data,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            data: Vec::new(),
            message: Some(message.into()),
        }
    }
}
