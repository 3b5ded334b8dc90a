//! # unform-rs
//!
//! A headless form-state engine for Rust.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient access.
//! You can depend on `unform-rs` to get the whole engine, or depend on
//! individual crates for finer-grained control.
//!
//! ```
//! use unform_rs::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let form = FormSession::new(FormSettings::default())
//!     .with_schema(ObjectSchema::new().field(SchemaField::email("email").required(true)));
//! form.register_field(FieldHandle::from_cell("email", FieldCell::new("nope"))).unwrap();
//!
//! let outcome = form.submit().await.unwrap();
//! assert_eq!(
//!     outcome.errors().and_then(|e| e.get("email")),
//!     Some("Enter a valid email address.")
//! );
//! # }
//! ```

/// Core types: values, errors, the schema boundary, settings and logging.
pub use unform_rs_core as core;

/// Field registry, data assembly, validation orchestration and sessions.
pub use unform_rs_forms as forms;

/// The reference object schema engine.
#[cfg(feature = "schema")]
pub use unform_rs_schema as schema;

// Third-party re-exports
pub use async_trait::async_trait;
pub use serde_json;
pub use tracing;

/// The types most form code needs.
pub mod prelude {
    pub use unform_rs_core::{
        AggregateValidationError, FieldFailure, FormError, FormResult, FormSettings,
        RegistryMode, Schema, SchemaError, Value,
    };
    pub use unform_rs_forms::{
        ErrorMap, FieldCell, FieldHandle, FormHelpers, FormSession, ScopedContext,
        SubmitOutcome, SubmitState,
    };

    #[cfg(feature = "schema")]
    pub use unform_rs_schema::{ObjectSchema, RuleFailure, RuleKind, SchemaField};
}
