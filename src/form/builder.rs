//! Control tree builder
//!
//! `FormEngine` materializes a schema into one value cell per distinct field
//! key, seeds the field state store, starts option loads for unconditional
//! bindings and wires dependent bindings to their parent cells.
//!
//! Must be driven from inside a Tokio runtime: option loads run as spawned
//! tasks. Setting a parent resets its dependents before `set_value` returns.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::cascade::{attach_dependency, OptionFetcher};
use super::cell::ValueCell;
use super::error::{FormError, FormResult, ValidationError};
use super::extractor::extract_fields;
use super::state::{FieldState, FieldStateStore};
use super::validators::compose;
use crate::domain::{FieldDefinition, FormSchema, OptionLoaderPort};
use crate::task::TaskGuard;

/// A live form built from a schema
pub struct FormEngine {
    loader: Arc<dyn OptionLoaderPort>,
    options_timeout: Option<Duration>,
    /// Field keys in first-seen order
    order: Vec<String>,
    /// `order` with every parent ahead of its dependents
    apply_order: Vec<String>,
    controls: HashMap<String, ValueCell>,
    definitions: HashMap<String, FieldDefinition>,
    store: Arc<FieldStateStore>,
    /// Initial option loads; dropping them aborts the tasks
    tasks: Vec<TaskGuard>,
}

impl FormEngine {
    pub fn new(loader: Arc<dyn OptionLoaderPort>) -> Self {
        Self {
            loader,
            options_timeout: None,
            order: Vec::new(),
            apply_order: Vec::new(),
            controls: HashMap::new(),
            definitions: HashMap::new(),
            store: Arc::new(FieldStateStore::new()),
            tasks: Vec::new(),
        }
    }

    /// Bound every option load by `timeout`; `None` waits indefinitely.
    pub fn with_options_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.options_timeout = timeout;
        self
    }

    /// Replace the current form with one built from `schema`.
    pub fn load_schema(&mut self, schema: &FormSchema) {
        let fields = extract_fields(schema);
        tracing::debug!("Building form '{}' from {} field definitions", schema.title, fields.len());
        self.build(&fields);
    }

    /// Build controls from an already extracted field list.
    ///
    /// Everything from a previous build is discarded first: its tasks are
    /// aborted and its cells and field states are dropped.
    pub fn build(&mut self, fields: &[FieldDefinition]) {
        self.tasks.clear();

        let mut order = Vec::new();
        let mut controls = HashMap::new();
        let mut definitions = HashMap::new();
        let mut store = FieldStateStore::new();

        for field in fields {
            if controls.contains_key(&field.key) {
                tracing::debug!("Duplicate field key '{}'; keeping first definition", field.key);
                continue;
            }
            let cell = ValueCell::new(field.default_value.clone(), compose(field));
            store.seed(&field.key, field.options.clone());
            controls.insert(field.key.clone(), cell);
            definitions.insert(field.key.clone(), field.clone());
            order.push(field.key.clone());
        }

        let store = Arc::new(store);
        let fetcher = Arc::new(OptionFetcher::new(
            Arc::clone(&self.loader),
            Arc::clone(&store),
            self.options_timeout,
        ));
        let mut tasks = Vec::new();

        // Unconditional bindings load right away
        for key in &order {
            let Some(api) = definitions[key].api.as_ref() else {
                continue;
            };
            if api.dependency.is_none() {
                tasks.extend(fetcher.spawn_load(key, api, None));
            }
        }

        // Dependent bindings react to their parent's changes
        for key in &order {
            let Some((api, parent_key)) = definitions[key].dependent_binding() else {
                continue;
            };
            let Some(parent) = controls.get(parent_key) else {
                tracing::warn!("Field '{}' depends on unknown field '{}'", key, parent_key);
                continue;
            };
            if parent_key == key {
                tracing::warn!("Field '{}' depends on itself; dependency ignored", key);
                continue;
            }
            attach_dependency(&fetcher, parent, key, &controls[key], api);
        }

        let mut apply_order = order.clone();
        apply_order.sort_by_key(|key| dependency_depth(&definitions, key));

        self.order = order;
        self.apply_order = apply_order;
        self.controls = controls;
        self.definitions = definitions;
        self.store = store;
        self.tasks = tasks;
    }

    /// Field keys in schema order
    pub fn keys(&self) -> &[String] {
        &self.order
    }

    pub fn control(&self, key: &str) -> Option<&ValueCell> {
        self.controls.get(key)
    }

    pub fn definition(&self, key: &str) -> Option<&FieldDefinition> {
        self.definitions.get(key)
    }

    pub fn set_value(&self, key: &str, value: Value) -> FormResult<()> {
        let cell = self
            .controls
            .get(key)
            .ok_or_else(|| FormError::UnknownControl(key.to_string()))?;
        cell.set(value);
        Ok(())
    }

    /// Set every known key present in `values`; unknown keys are ignored.
    ///
    /// Parents are written before their dependents, so a dependent value in
    /// the same patch survives the parent's cascade.
    pub fn patch_value(&self, values: &Map<String, Value>) {
        for key in &self.apply_order {
            if let Some(value) = values.get(key) {
                self.controls[key].set(value.clone());
            }
        }
    }

    /// Restore every control to its seeded value, parents first
    pub fn reset(&self) {
        for key in &self.apply_order {
            self.controls[key].reset();
        }
    }

    /// Flat key → value map of the whole form
    pub fn form_value(&self) -> Map<String, Value> {
        self.order
            .iter()
            .map(|key| (key.clone(), self.controls[key].get()))
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.controls.values().all(ValueCell::is_valid)
    }

    /// Failing validators per invalid control
    pub fn errors(&self) -> HashMap<String, Vec<ValidationError>> {
        self.controls
            .iter()
            .filter_map(|(key, cell)| {
                let errors = cell.errors();
                (!errors.is_empty()).then(|| (key.clone(), errors))
            })
            .collect()
    }

    pub fn field_state(&self, key: &str) -> Option<FieldState> {
        self.store.get(key)
    }

    pub fn subscribe_field_state(&self, key: &str) -> Option<watch::Receiver<FieldState>> {
        self.store.subscribe(key)
    }

    /// Stream of a field's states, starting with the current one
    pub fn field_state_stream(&self, key: &str) -> Option<WatchStream<FieldState>> {
        self.store.stream(key)
    }

    pub fn field_states(&self) -> HashMap<String, FieldState> {
        self.store.snapshot()
    }

    /// Wait until no field is loading options
    pub async fn settled(&self) {
        let waits = self
            .order
            .iter()
            .filter_map(|key| self.store.subscribe(key))
            .map(|mut rx| async move {
                let _ = rx.wait_for(|state| !state.loading).await;
            });
        futures::future::join_all(waits).await;
    }
}

/// Number of dependency hops from `key` up to a field without a parent.
/// Cycles and unknown parents end the walk.
fn dependency_depth(definitions: &HashMap<String, FieldDefinition>, key: &str) -> usize {
    let mut seen = HashSet::from([key]);
    let mut current = key;
    let mut depth = 0;
    while let Some((_, parent)) = definitions.get(current).and_then(|d| d.dependent_binding()) {
        if !definitions.contains_key(parent) || !seen.insert(parent) {
            break;
        }
        depth += 1;
        current = parent;
    }
    depth
}
