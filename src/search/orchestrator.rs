//! Debounced, latest-wins search orchestration
//!
//! Keystrokes go through `update_query`. A background task waits for a quiet
//! window, drops a value identical to the previously emitted one, then runs
//! the search. Starting a search aborts the one in flight, and a result is
//! only written while its request is still the latest.

use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use super::error::{SearchError, SearchResult};
use super::parser::parse_query;
use crate::domain::{AutoCompleteSearchString, SearchPort, SearchResponse, SearchSourceConfig};
use crate::task::TaskGuard;

/// Default quiet window before a query is searched
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Timing knobs for the orchestrator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub debounce: Duration,
    /// `None` waits for the collaborator indefinitely
    pub timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            timeout: None,
        }
    }
}

/// Observable search state
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SearchState {
    /// Latest text passed to `update_query`
    pub query: String,
    pub is_loading: bool,
    pub items: Vec<Value>,
    pub error_message: Option<String>,
    pub has_completed_search: bool,
}

struct SearchContext {
    source: SearchSourceConfig,
    port: Arc<dyn SearchPort>,
    timeout: Option<Duration>,
    state: watch::Sender<SearchState>,
    latest: AtomicU64,
}

impl SearchContext {
    /// Mutate the state only if `request` is still the latest one
    fn apply<F>(&self, request: u64, update: F) -> bool
    where
        F: FnOnce(&mut SearchState),
    {
        self.state.send_if_modified(|state| {
            if self.latest.load(Ordering::SeqCst) != request {
                return false;
            }
            update(state);
            true
        })
    }

    async fn execute(&self, request: u64, text: String) {
        let query = text.trim();
        if query.is_empty() || self.source.endpoint.is_empty() || self.source.fields.is_empty() {
            self.apply(request, |state| {
                state.is_loading = false;
                state.items = Vec::new();
                state.error_message = None;
                state.has_completed_search = false;
            });
            return;
        }

        self.apply(request, |state| {
            state.is_loading = true;
            state.error_message = None;
            state.has_completed_search = false;
        });

        let mut filters = self.source.base_filters.clone();
        filters.extend(parse_query(query, &self.source));
        tracing::debug!(
            "Searching '{}' for '{}' with {} filters",
            self.source.key,
            query,
            filters.len()
        );

        match self.run(query, &filters).await {
            Ok(items) => {
                let applied = self.apply(request, |state| {
                    state.is_loading = false;
                    state.has_completed_search = true;
                    state.items = items;
                });
                if !applied {
                    tracing::debug!("Discarding stale results for '{}'", query);
                }
            }
            Err(e) => {
                tracing::warn!("Search on '{}' failed: {}", self.source.key, e);
                self.apply(request, |state| {
                    state.is_loading = false;
                    state.items = Vec::new();
                    state.error_message = Some(e.to_string());
                });
            }
        }
    }

    async fn run(
        &self,
        query: &str,
        filters: &[AutoCompleteSearchString],
    ) -> SearchResult<Vec<Value>> {
        let request = self.port.search(&self.source, query, filters);
        let response: SearchResponse = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| SearchError::timed_out(limit))??,
            None => request.await?,
        };

        if response.is_success {
            Ok(response.data)
        } else {
            Err(SearchError::Rejected(
                response.message.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

/// Couples the query parser to a search collaborator for one source
pub struct SearchOrchestrator {
    context: Arc<SearchContext>,
    input: mpsc::UnboundedSender<String>,
    _worker: TaskGuard,
}

impl SearchOrchestrator {
    /// Start the orchestrator's background task. Requires a Tokio runtime.
    pub fn new(
        source: SearchSourceConfig,
        port: Arc<dyn SearchPort>,
        config: OrchestratorConfig,
    ) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        let context = Arc::new(SearchContext {
            source,
            port,
            timeout: config.timeout,
            state,
            latest: AtomicU64::new(0),
        });
        let (input, rx) = mpsc::unbounded_channel();
        let worker = TaskGuard::spawn(debounce_loop(rx, Arc::clone(&context), config.debounce));

        Self {
            context,
            input,
            _worker: worker,
        }
    }

    pub fn source(&self) -> &SearchSourceConfig {
        &self.context.source
    }

    /// Feed a new query text into the debounced pipeline
    pub fn update_query(&self, text: impl Into<String>) {
        let text = text.into();
        self.context.state.send_modify(|state| state.query = text.clone());
        if self.input.send(text).is_err() {
            tracing::warn!("Search worker for '{}' has stopped", self.context.source.key);
        }
    }

    pub fn query(&self) -> String {
        self.context.state.borrow().query.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.context.state.borrow().is_loading
    }

    pub fn items(&self) -> Vec<Value> {
        self.context.state.borrow().items.clone()
    }

    pub fn error_message(&self) -> Option<String> {
        self.context.state.borrow().error_message.clone()
    }

    pub fn has_completed_search(&self) -> bool {
        self.context.state.borrow().has_completed_search
    }

    pub fn state(&self) -> SearchState {
        self.context.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.context.state.subscribe()
    }
}

async fn debounce_loop(
    mut input: mpsc::UnboundedReceiver<String>,
    context: Arc<SearchContext>,
    debounce: Duration,
) {
    let mut last_emitted: Option<String> = None;
    let mut _in_flight: Option<TaskGuard> = None;

    while let Some(mut pending) = input.recv().await {
        loop {
            tokio::select! {
                next = input.recv() => match next {
                    Some(text) => pending = text,
                    None => return,
                },
                _ = tokio::time::sleep(debounce) => break,
            }
        }

        if last_emitted.as_deref() == Some(pending.as_str()) {
            continue;
        }
        last_emitted = Some(pending.clone());

        let request = context.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let ctx = Arc::clone(&context);
        // replacing the guard aborts the superseded search
        _in_flight = Some(TaskGuard::spawn(async move {
            ctx.execute(request, pending).await;
        }));
    }
}
