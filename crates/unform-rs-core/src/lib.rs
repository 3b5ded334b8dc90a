//! # unform-rs-core
//!
//! Core types for the unform-rs form engine: the dynamic [`Value`] model,
//! error types, the [`Schema`] boundary, settings, logging and the
//! dotted-path codec. This crate has no dependency on the other unform-rs
//! crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`value`] - The dynamic value model
//! - [`schema`] - The schema engine trait and its options
//! - [`settings`] / [`settings_loader`] - Form settings and their loading
//! - [`logging`] - Tracing-based logging integration
//! - [`utils`] - The dotted-path codec

pub mod error;
pub mod logging;
pub mod schema;
pub mod settings;
pub mod settings_loader;
pub mod utils;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use error::{AggregateValidationError, FieldFailure, FormError, FormResult, SchemaError};
pub use schema::{CastOptions, Schema, ValidateOptions};
pub use settings::{FormSettings, RegistryMode};
pub use value::{Value, ValueMap};
