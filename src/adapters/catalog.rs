use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Settings;
use crate::domain::{
    ApiBinding, AutoCompleteSearchString, OptionLoaderPort, SearchPort, SearchResponse,
    SearchSourceConfig, WildcardOperator,
};

/// Binding parameter naming the record field compared with the parent value
pub const DEPENDENCY_FIELD_PARAM: &str = "dependency_field";
const DEFAULT_DEPENDENCY_FIELD: &str = "parent";

/// Endpoint → records store serving both option loads and searches
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    records: Arc<RwLock<HashMap<String, Vec<Value>>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding every `catalogs` entry of `settings`; repeated endpoints are concatenated.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut records: HashMap<String, Vec<Value>> = HashMap::new();
        for catalog in &settings.catalogs {
            records
                .entry(catalog.endpoint.clone())
                .or_default()
                .extend(catalog.records.iter().cloned());
        }
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Builder-style insert. Clones see the new endpoint too; if one of them
    /// holds the lock the records are not added and a warning is logged.
    pub fn with_records(mut self, endpoint: impl Into<String>, records: Vec<Value>) -> Self {
        let endpoint = endpoint.into();
        if let Some(lock) = Arc::get_mut(&mut self.records) {
            lock.get_mut().insert(endpoint, records);
            return self;
        }
        match self.records.try_write() {
            Ok(mut map) => {
                map.insert(endpoint, records);
            }
            Err(_) => tracing::warn!(
                "Catalog is locked by a clone; records for '{}' were not added (use `insert`)",
                endpoint
            ),
        }
        self
    }

    pub async fn insert(&self, endpoint: impl Into<String>, records: Vec<Value>) {
        let mut map = self.records.write().await;
        map.insert(endpoint.into(), records);
    }

    pub async fn endpoints(&self) -> Vec<String> {
        let map = self.records.read().await;
        let mut endpoints: Vec<String> = map.keys().cloned().collect();
        endpoints.sort();
        endpoints
    }

    async fn records_for(&self, endpoint: &str) -> anyhow::Result<Vec<Value>> {
        let map = self.records.read().await;
        map.get(endpoint)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Unknown catalog endpoint '{}'", endpoint))
    }
}

#[async_trait]
impl OptionLoaderPort for InMemoryCatalog {
    async fn fetch_options(
        &self,
        binding: &ApiBinding,
        dependency_value: Option<&Value>,
    ) -> anyhow::Result<Vec<Value>> {
        let records = self.records_for(&binding.endpoint).await?;
        let dependency_field = binding
            .params
            .get(DEPENDENCY_FIELD_PARAM)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_DEPENDENCY_FIELD);

        let matching: Vec<Value> = records
            .into_iter()
            .filter(|record| {
                binding
                    .params
                    .iter()
                    .filter(|(name, _)| name.as_str() != DEPENDENCY_FIELD_PARAM)
                    .all(|(name, expected)| field_equals(record, name, expected))
            })
            .filter(|record| match dependency_value {
                Some(parent) => field_equals(record, dependency_field, parent),
                None => true,
            })
            .collect();

        tracing::debug!(
            "Catalog '{}' answered {} option records",
            binding.endpoint,
            matching.len()
        );
        Ok(matching)
    }
}

#[async_trait]
impl SearchPort for InMemoryCatalog {
    async fn search(
        &self,
        source: &SearchSourceConfig,
        _query: &str,
        filters: &[AutoCompleteSearchString],
    ) -> anyhow::Result<SearchResponse> {
        let records = match self.records_for(&source.endpoint).await {
            Ok(records) => records,
            Err(e) => return Ok(SearchResponse::failure(e.to_string())),
        };

        let matching: Vec<Value> = records
            .into_iter()
            .filter(|record| filters.iter().all(|filter| matches_filter(record, filter)))
            .collect();

        Ok(SearchResponse::success(matching))
    }
}

/// Scalar rendering used for comparisons; objects, arrays and null never match
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn field_equals(record: &Value, field: &str, expected: &Value) -> bool {
    let actual = record.get(field).and_then(scalar_text);
    match (actual, scalar_text(expected)) {
        (Some(actual), Some(expected)) => actual == expected,
        _ => false,
    }
}

fn matches_filter(record: &Value, filter: &AutoCompleteSearchString) -> bool {
    let hit = record
        .get(&filter.parameter_name)
        .and_then(scalar_text)
        .map(|text| wildcard_match(&text, &filter.parameter_value, filter.wildcard_operator))
        .unwrap_or(false);

    if filter.conditional_operator.is_negated() {
        !hit
    } else {
        hit
    }
}

fn wildcard_match(text: &str, needle: &str, wildcard: WildcardOperator) -> bool {
    let text = text.to_lowercase();
    let needle = needle.to_lowercase();
    match wildcard {
        WildcardOperator::StartsWith => text.starts_with(&needle),
        WildcardOperator::EndsWith => text.ends_with(&needle),
        WildcardOperator::Exact => text == needle,
        WildcardOperator::Contains | WildcardOperator::Auto => text.contains(&needle),
    }
}
