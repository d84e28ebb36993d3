//! Per-field runtime state, kept apart from the value cells
//!
//! Options are async-derived UI state rather than form data, so they live in
//! their own store. Every slot carries a request generation: a load result is
//! applied only while its token is still the latest one issued for the key.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::domain::FormOption;

/// Where a field's option load currently stands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Loading flag and option list for one field
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FieldState {
    pub loading: bool,
    pub options: Vec<FormOption>,
    pub phase: LoadPhase,
}

impl FieldState {
    pub fn with_options(options: Vec<FormOption>) -> Self {
        Self {
            loading: false,
            options,
            phase: LoadPhase::Idle,
        }
    }
}

struct Slot {
    sender: watch::Sender<FieldState>,
    generation: AtomicU64,
}

/// Key → field state map for one form instance
#[derive(Default)]
pub struct FieldStateStore {
    slots: HashMap<String, Slot>,
}

impl FieldStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the slot for `key` unless one exists already (first definition wins).
    pub fn seed(&mut self, key: &str, options: Vec<FormOption>) {
        self.slots.entry(key.to_string()).or_insert_with(|| {
            let (sender, _) = watch::channel(FieldState::with_options(options));
            Slot {
                sender,
                generation: AtomicU64::new(0),
            }
        });
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<FieldState> {
        self.slots.get(key).map(|slot| slot.sender.borrow().clone())
    }

    pub fn subscribe(&self, key: &str) -> Option<watch::Receiver<FieldState>> {
        self.slots.get(key).map(|slot| slot.sender.subscribe())
    }

    /// Stream of states for `key`, starting with the current one
    pub fn stream(&self, key: &str) -> Option<WatchStream<FieldState>> {
        self.subscribe(key).map(WatchStream::new)
    }

    /// Copy of every field's state
    pub fn snapshot(&self) -> HashMap<String, FieldState> {
        self.slots
            .iter()
            .map(|(key, slot)| (key.clone(), slot.sender.borrow().clone()))
            .collect()
    }

    /// Whether any field is waiting on its loader
    pub fn any_loading(&self) -> bool {
        self.slots.values().any(|slot| slot.sender.borrow().loading)
    }

    /// Mark `key` as loading, drop its current options and issue a fresh
    /// request token. Earlier tokens for the key become stale.
    pub fn begin_load(&self, key: &str) -> Option<u64> {
        let slot = self.slots.get(key)?;
        let mut token = 0;
        slot.sender.send_modify(|state| {
            token = slot.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.loading = true;
            state.options = Vec::new();
            state.phase = LoadPhase::Loading;
        });
        Some(token)
    }

    /// Apply a load result if `token` is still current. Returns whether it was applied.
    pub fn finish_load(&self, key: &str, token: u64, options: Option<Vec<FormOption>>) -> bool {
        let Some(slot) = self.slots.get(key) else {
            return false;
        };
        slot.sender.send_if_modified(|state| {
            if slot.generation.load(Ordering::SeqCst) != token {
                return false;
            }
            state.loading = false;
            match options {
                Some(options) => {
                    state.options = options;
                    state.phase = LoadPhase::Loaded;
                }
                None => {
                    state.options = Vec::new();
                    state.phase = LoadPhase::Failed;
                }
            }
            true
        })
    }

    /// Drop options, stop loading and invalidate any in-flight request for `key`.
    pub fn clear(&self, key: &str) {
        if let Some(slot) = self.slots.get(key) {
            slot.sender.send_modify(|state| {
                slot.generation.fetch_add(1, Ordering::SeqCst);
                state.loading = false;
                state.options = Vec::new();
                state.phase = LoadPhase::Idle;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(key: &str) -> FieldStateStore {
        let mut store = FieldStateStore::new();
        store.seed(key, vec![FormOption::new("Static", "s")]);
        store
    }

    #[test]
    fn test_seed_first_wins() {
        let mut store = store_with("k");
        store.seed("k", vec![]);

        let state = store.get("k").unwrap();
        assert_eq!(state.options.len(), 1);
        assert!(!state.loading);
        assert_eq!(state.phase, LoadPhase::Idle);
    }

    #[test]
    fn test_load_lifecycle() {
        let store = store_with("k");
        let token = store.begin_load("k").unwrap();
        let loading = store.get("k").unwrap();
        assert!(loading.loading);
        assert!(loading.options.is_empty());

        assert!(store.finish_load("k", token, Some(vec![FormOption::new("A", "a")])));
        let state = store.get("k").unwrap();
        assert!(!state.loading);
        assert_eq!(state.phase, LoadPhase::Loaded);
        assert_eq!(state.options[0].label, "A");
    }

    #[test]
    fn test_stale_token_is_discarded() {
        let store = store_with("k");
        let first = store.begin_load("k").unwrap();
        let second = store.begin_load("k").unwrap();

        assert!(!store.finish_load("k", first, Some(vec![FormOption::new("Old", "o")])));
        assert!(store.get("k").unwrap().loading);

        assert!(store.finish_load("k", second, Some(vec![FormOption::new("New", "n")])));
        assert_eq!(store.get("k").unwrap().options[0].label, "New");
    }

    #[test]
    fn test_failure_surfaces_as_empty_options() {
        let store = store_with("k");
        let token = store.begin_load("k").unwrap();
        store.finish_load("k", token, None);

        let state = store.get("k").unwrap();
        assert!(!state.loading);
        assert!(state.options.is_empty());
        assert_eq!(state.phase, LoadPhase::Failed);
    }

    #[test]
    fn test_clear_invalidates_in_flight_load() {
        let store = store_with("k");
        let token = store.begin_load("k").unwrap();
        store.clear("k");

        assert!(!store.finish_load("k", token, Some(vec![FormOption::new("Late", "l")])));
        let state = store.get("k").unwrap();
        assert!(state.options.is_empty());
        assert_eq!(state.phase, LoadPhase::Idle);
    }

    #[test]
    fn test_unknown_key() {
        let store = FieldStateStore::new();
        assert!(store.get("nope").is_none());
        assert!(store.begin_load("nope").is_none());
        assert!(!store.finish_load("nope", 1, None));
        assert!(store.is_empty());
    }
}
