use async_trait::async_trait;
use serde_json::Value;

pub mod schema;
pub mod search;

pub use schema::*;
pub use search::*;

/// Port for loading picker options from a remote source.
///
/// Implementations return raw records; the engine maps them through the
/// binding's `label_key`/`value_key`.
#[async_trait]
pub trait OptionLoaderPort: Send + Sync {
    async fn fetch_options(
        &self,
        binding: &ApiBinding,
        dependency_value: Option<&Value>,
    ) -> anyhow::Result<Vec<Value>>;
}

/// Port for running a structured search against a catalog
#[async_trait]
pub trait SearchPort: Send + Sync {
    async fn search(
        &self,
        source: &SearchSourceConfig,
        query: &str,
        filters: &[AutoCompleteSearchString],
    ) -> anyhow::Result<SearchResponse>;
}
