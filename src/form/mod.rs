//! Dynamic form materialization
//!
//! Turns a [`FormSchema`](crate::domain::FormSchema) into live value cells:
//! - `extractor`: flattens tabs, rows and fieldsets into field definitions
//! - `validators`: composes validator chains from declarative rules
//! - `cell`: reactive value holders
//! - `state`: per-field loading flag and options
//! - `cascade`: option loading and parent → child reloads
//! - `builder`: the `FormEngine` tying it together

pub mod builder;
pub mod cascade;
pub mod cell;
pub mod error;
pub mod extractor;
pub mod state;
pub mod validators;

pub use builder::FormEngine;
pub use cell::{ValueCell, WeakValueCell};
pub use error::{FormError, FormResult, ValidationError};
pub use extractor::extract_fields;
pub use state::{FieldState, FieldStateStore, LoadPhase};
