//! # Formwright - Dynamic Forms and Smart Search
//!
//! Formwright turns declarative JSON form schemas into live, validated form
//! state and parses compact "smart search" queries into structured filters.
//!
//! ## Features
//!
//! - **Schema materialization**: tabs, rows and nested fieldsets flattened into value cells
//! - **Validation**: required, length, numeric/date bounds, pattern and email rules
//! - **Option cascades**: picker options loaded from a catalog, reloaded when a parent changes
//! - **Smart search**: `ON:Apollo !MN:12345` style queries with debounced, latest-wins requests
//! - **Validation of configuration**: every configuration problem reported at once
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formwright::adapters::InMemoryCatalog;
//! use formwright::domain::FormSchema;
//! use formwright::form::FormEngine;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let schema = FormSchema::from_path("forms/registration.json")?;
//!     let mut engine = FormEngine::new(Arc::new(InMemoryCatalog::new()));
//!     engine.load_schema(&schema);
//!     engine.settled().await;
//!
//!     println!("{:?}", engine.form_value());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Formwright follows Hexagonal Architecture:
//! - **Domain**: schema and search models plus the collaborator ports
//! - **Form / Search**: the engines driving those models
//! - **Adapters**: in-memory catalog implementing the ports
//! - **Config**: configuration management

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod form;
pub mod search;
pub mod task;
