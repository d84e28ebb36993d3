//! Declarative form schema model
//!
//! Pure data: everything here is (de)serializable from the JSON schema
//! documents that describe a form. No behavior beyond small accessors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::form::error::{FormError, FormResult};

// ============================================================================
// Form Schema
// ============================================================================

/// Layout mode of a form
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Flat sequence of rows
    #[default]
    Standard,
    /// Named tabs, each owning its own rows
    Tabs,
}

/// Canonical description of a form
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub layout: LayoutMode,
    /// Rows used when `layout` is `standard`
    #[serde(default)]
    pub rows: Vec<RowConfig>,
    /// Tabs used when `layout` is `tabs`
    #[serde(default)]
    pub tabs: Vec<TabConfig>,
}

impl FormSchema {
    /// Rows that are semantically active for the schema's layout, in order.
    pub fn active_rows(&self) -> Vec<&RowConfig> {
        match self.layout {
            LayoutMode::Standard => self.rows.iter().collect(),
            LayoutMode::Tabs => self.tabs.iter().flat_map(|tab| tab.rows.iter()).collect(),
        }
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> FormResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> FormResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a schema document from disk. JSON and YAML are accepted.
    pub fn from_path(path: impl AsRef<Path>) -> FormResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| FormError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| FormError::SchemaParse(format!("{}: {}", path.display(), e))),
            _ => Self::from_json(&content),
        }
    }
}

/// A named tab owning its own rows
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TabConfig {
    pub label: String,
    #[serde(default)]
    pub rows: Vec<RowConfig>,
}

/// Ordered sequence of columns
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RowConfig {
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

/// One layout column; holds at most one field
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Layout span token, opaque to the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldDefinition>,
}

// ============================================================================
// Fields
// ============================================================================

/// Closed set of control kinds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    Textarea,
    Number,
    Email,
    Password,
    Select,
    Multiselect,
    Radio,
    Checkbox,
    Toggle,
    Date,
    Datetime,
    Time,
    Slider,
    Rating,
    Color,
    File,
    Richtext,
    Signature,
    Autocomplete,
    SmartSearch,
    Hidden,
    /// Container grouping nested rows; holds no value of its own
    Fieldset,
}

impl FieldType {
    /// Whether this kind only groups nested rows
    pub fn is_container(&self) -> bool {
        matches!(self, FieldType::Fieldset)
    }

    /// Whether values of this kind are option picks
    pub fn has_options(&self) -> bool {
        matches!(
            self,
            FieldType::Select
                | FieldType::Multiselect
                | FieldType::Radio
                | FieldType::Autocomplete
        )
    }
}

/// Definition of a single form field
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Unique key within the whole schema. Not enforced; first definition wins.
    pub key: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub default_value: Value,
    /// Static option list
    #[serde(default)]
    pub options: Vec<FormOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRule>,
    /// Nested rows for `fieldset` containers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<RowConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

impl FieldDefinition {
    pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            field_type,
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = value;
        self
    }

    pub fn with_options(mut self, options: Vec<FormOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_api(mut self, api: ApiBinding) -> Self {
        self.api = Some(api);
        self
    }

    pub fn with_validation(mut self, validation: ValidationRule) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_rows(mut self, rows: Vec<RowConfig>) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Binding whose loading is gated on a parent field, if any
    pub fn dependent_binding(&self) -> Option<(&ApiBinding, &str)> {
        let api = self.api.as_ref()?;
        let parent = api.dependency.as_deref()?;
        Some((api, parent))
    }
}

/// Declarative validation rules for a field
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Lower bound; a number, a numeric string or a date string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    /// Upper bound; a number, a numeric string or a date string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default)]
    pub email: bool,
}

/// Link between a field and a remote option source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBinding {
    pub endpoint: String,
    #[serde(default = "default_label_key")]
    pub label_key: String,
    #[serde(default = "default_value_key")]
    pub value_key: String,
    /// Key of the parent field gating this binding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,
    /// Static parameters forwarded to the option loader
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

fn default_label_key() -> String {
    "label".to_string()
}

fn default_value_key() -> String {
    "value".to_string()
}

impl ApiBinding {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            label_key: default_label_key(),
            value_key: default_value_key(),
            dependency: None,
            params: Map::new(),
        }
    }

    pub fn with_keys(mut self, label_key: impl Into<String>, value_key: impl Into<String>) -> Self {
        self.label_key = label_key.into();
        self.value_key = value_key.into();
        self
    }

    pub fn depends_on(mut self, parent: impl Into<String>) -> Self {
        self.dependency = Some(parent.into());
        self
    }
}

// ============================================================================
// Options
// ============================================================================

/// Scalar value carried by an option
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl OptionValue {
    /// Map an arbitrary JSON value to an option value; compound values are rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(OptionValue::Bool(*b)),
            Value::Number(n) => Some(OptionValue::Number(n.clone())),
            Value::String(s) => Some(OptionValue::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            OptionValue::Bool(b) => Value::Bool(*b),
            OptionValue::Number(n) => Value::Number(n.clone()),
            OptionValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Text(s.to_string())
    }
}

/// Label/value record presented by pickers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormOption {
    pub label: String,
    pub value: OptionValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FormOption {
    pub fn new(label: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            icon: None,
            image: None,
            description: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
