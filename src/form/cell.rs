//! Reactive value cell
//!
//! A `ValueCell` holds one field's current value and its validator chain.
//! Changes are published over a `tokio::sync::watch` channel, so observers
//! always see the latest value and never a partially written one.
//!
//! Reactions registered with [`ValueCell::on_change`] run synchronously
//! inside `set`, before it returns.

use serde_json::Value;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::error::ValidationError;
use super::validators::Validator;

type Reaction = Arc<dyn Fn(&Value) + Send + Sync>;

/// Observable value holder with attached validators. Clones share state.
#[derive(Clone)]
pub struct ValueCell {
    sender: Arc<watch::Sender<Value>>,
    validators: Arc<Vec<Validator>>,
    initial: Arc<Value>,
    reactions: Arc<RwLock<Vec<Reaction>>>,
}

/// Non-owning handle to a [`ValueCell`]
#[derive(Clone)]
pub struct WeakValueCell {
    sender: Weak<watch::Sender<Value>>,
    validators: Weak<Vec<Validator>>,
    initial: Weak<Value>,
    reactions: Weak<RwLock<Vec<Reaction>>>,
}

impl WeakValueCell {
    pub fn upgrade(&self) -> Option<ValueCell> {
        Some(ValueCell {
            sender: self.sender.upgrade()?,
            validators: self.validators.upgrade()?,
            initial: self.initial.upgrade()?,
            reactions: self.reactions.upgrade()?,
        })
    }
}

impl fmt::Debug for ValueCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCell")
            .field("value", &*self.sender.borrow())
            .field("validators", &self.validators)
            .field("initial", &self.initial)
            .finish_non_exhaustive()
    }
}

impl ValueCell {
    pub fn new(initial: Value, validators: Vec<Validator>) -> Self {
        let (sender, _) = watch::channel(initial.clone());
        Self {
            sender: Arc::new(sender),
            validators: Arc::new(validators),
            initial: Arc::new(initial),
            reactions: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn downgrade(&self) -> WeakValueCell {
        WeakValueCell {
            sender: Arc::downgrade(&self.sender),
            validators: Arc::downgrade(&self.validators),
            initial: Arc::downgrade(&self.initial),
            reactions: Arc::downgrade(&self.reactions),
        }
    }

    /// Current value
    pub fn get(&self) -> Value {
        self.sender.borrow().clone()
    }

    /// Replace the value, notify subscribers, then run every reaction in
    /// registration order.
    pub fn set(&self, value: Value) {
        self.sender.send_replace(value.clone());
        let reactions = match self.reactions.read() {
            Ok(reactions) => reactions.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for reaction in reactions {
            reaction(&value);
        }
    }

    /// Replace the value and notify subscribers without running reactions
    pub fn publish(&self, value: Value) {
        self.sender.send_replace(value);
    }

    /// Run `reaction` with the new value on every later `set`.
    pub fn on_change(&self, reaction: impl Fn(&Value) + Send + Sync + 'static) {
        let mut reactions = match self.reactions.write() {
            Ok(reactions) => reactions,
            Err(poisoned) => poisoned.into_inner(),
        };
        reactions.push(Arc::new(reaction));
    }

    /// Restore the seeded value
    pub fn reset(&self) {
        self.set(self.initial.as_ref().clone());
    }

    pub fn initial_value(&self) -> &Value {
        &self.initial
    }

    /// Receiver positioned at the current value; `changed()` fires on the next `set`.
    pub fn subscribe(&self) -> watch::Receiver<Value> {
        self.sender.subscribe()
    }

    /// Stream of future values (the current value is not replayed).
    /// Both `set` and `publish` reach it.
    pub fn changes(&self) -> WatchStream<Value> {
        WatchStream::from_changes(self.subscribe())
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Every failing validator for the current value, in chain order
    pub fn errors(&self) -> Vec<ValidationError> {
        let value = self.sender.borrow();
        self.validators
            .iter()
            .filter_map(|v| v.validate(&value).err())
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }
}
