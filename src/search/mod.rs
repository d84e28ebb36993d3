//! Smart search: query parsing and the debounced request orchestrator

pub mod error;
pub mod orchestrator;
pub mod parser;

pub use error::{SearchError, SearchResult};
pub use orchestrator::{OrchestratorConfig, SearchOrchestrator, SearchState};
pub use parser::parse_query;
