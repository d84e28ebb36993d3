//! Option loading and the parent → child dependency cascade
//!
//! A dependent field moves through `Idle → Loading → Loaded | Failed` and
//! back to `Idle` when its parent is cleared. The reset and the move to
//! `Loading` happen inside the parent's `set`; only the fetch is async.
//!
//! Only one level is followed: the dependent's cleared value is published
//! to its subscribers without running its own reactions, so fields
//! depending on *it* are not reset in turn.

use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::cell::ValueCell;
use super::state::FieldStateStore;
use super::validators::is_empty_value;
use crate::domain::{ApiBinding, FormOption, OptionLoaderPort, OptionValue};
use crate::task::TaskGuard;

/// Map raw loader records to options through the binding's label/value keys.
///
/// Object records missing either key are skipped; scalar records serve as
/// both label and value.
pub fn map_records(binding: &ApiBinding, records: Vec<Value>) -> Vec<FormOption> {
    records
        .into_iter()
        .filter_map(|record| match &record {
            Value::Object(map) => {
                let label = scalar_text(map.get(&binding.label_key)?)?;
                let value = OptionValue::from_value(map.get(&binding.value_key)?)?;
                let text = |k: &str| map.get(k).and_then(Value::as_str).map(str::to_string);
                Some(FormOption {
                    label,
                    value,
                    icon: text("icon"),
                    image: text("image"),
                    description: text("description"),
                })
            }
            other => Some(FormOption::new(scalar_text(other)?, OptionValue::from_value(other)?)),
        })
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Runs option loads against the loader and writes results into the store
pub struct OptionFetcher {
    loader: Arc<dyn OptionLoaderPort>,
    store: Arc<FieldStateStore>,
    timeout: Option<Duration>,
}

impl OptionFetcher {
    pub fn new(
        loader: Arc<dyn OptionLoaderPort>,
        store: Arc<FieldStateStore>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            loader,
            store,
            timeout,
        }
    }

    pub fn store(&self) -> &Arc<FieldStateStore> {
        &self.store
    }

    /// Mark `key` loading now and resolve its options in a background task.
    pub fn spawn_load(
        self: &Arc<Self>,
        key: &str,
        binding: &ApiBinding,
        dependency: Option<Value>,
    ) -> Option<TaskGuard> {
        let token = self.store.begin_load(key)?;
        let fetcher = Arc::clone(self);
        let key = key.to_string();
        let binding = binding.clone();
        Some(TaskGuard::spawn(async move {
            fetcher.fetch(&key, token, &binding, dependency.as_ref()).await;
        }))
    }

    /// Fetch and apply options for a load already started with `token`.
    /// Failures and timeouts become empty options; nothing is propagated.
    pub async fn fetch(&self, key: &str, token: u64, binding: &ApiBinding, dependency: Option<&Value>) {
        let request = self.loader.fetch_options(binding, dependency);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, request).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("timed out after {}ms", limit.as_millis())),
            },
            None => request.await,
        };

        let options = match result {
            Ok(records) => Some(map_records(binding, records)),
            Err(e) => {
                tracing::warn!(
                    "Failed to load options for '{}' from '{}': {}",
                    key,
                    binding.endpoint,
                    e
                );
                None
            }
        };

        if !self.store.finish_load(key, token, options) {
            tracing::debug!("Discarding superseded option load for '{}'", key);
        }
    }
}

/// Apply one parent value to a dependent field. Returns the load task, if one was started.
pub fn apply_parent_value(
    fetcher: &Arc<OptionFetcher>,
    child_key: &str,
    child: &ValueCell,
    binding: &ApiBinding,
    parent_value: &Value,
) -> Option<TaskGuard> {
    child.publish(Value::Null);

    if is_empty_value(parent_value) {
        tracing::debug!("Parent of '{}' cleared; options reset", child_key);
        fetcher.store().clear(child_key);
        return None;
    }

    tracing::debug!("Parent of '{}' changed; reloading options", child_key);
    fetcher.spawn_load(child_key, binding, Some(parent_value.clone()))
}

/// Reset and reload `child_key` on every `set` of `parent`.
///
/// The parent holds the child weakly, so dropping the form's cells ends the
/// reaction and aborts its in-flight load. A newer parent value aborts the
/// load started for the previous one.
pub fn attach_dependency(
    fetcher: &Arc<OptionFetcher>,
    parent: &ValueCell,
    child_key: &str,
    child: &ValueCell,
    binding: &ApiBinding,
) {
    let fetcher = Arc::clone(fetcher);
    let child_key = child_key.to_string();
    let child = child.downgrade();
    let binding = binding.clone();
    let in_flight: Mutex<Option<TaskGuard>> = Mutex::new(None);

    parent.on_change(move |parent_value| {
        let Some(child) = child.upgrade() else {
            return;
        };
        let load = apply_parent_value(&fetcher, &child_key, &child, &binding, parent_value);
        let mut slot = match in_flight.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = load;
    });
}
