//! # unform-rs-forms
//!
//! Form sessions for unform-rs. A [`FormSession`] keeps a registry of field
//! handles, assembles their values into one nested data object on submit,
//! runs it through an optional [`Schema`](unform_rs_core::Schema) and
//! publishes the resulting [`ErrorMap`] back to every field through a
//! [`ScopedContext`].
//!
//! ## Modules
//!
//! - [`field`] - Field handles, value sources and reset targets
//! - [`registry`] - The field registry (snapshot and accumulator variants)
//! - [`assembler`] - Registry snapshot to nested data object
//! - [`validation`] - Schema orchestration and error map construction
//! - [`error_map`] - The published error map
//! - [`context`] - The scoped context handed to fields
//! - [`session`] - The form session and its submit state machine

pub mod assembler;
pub mod context;
pub mod error_map;
pub mod field;
pub mod registry;
pub mod session;
pub mod validation;

pub use context::ScopedContext;
pub use error_map::{ErrorMap, ErrorState};
pub use field::{FieldCell, FieldHandle};
pub use registry::{
    create_registry, AccumulatorRegistry, FieldRegistry, RegistrySnapshot, SnapshotRegistry,
};
pub use session::{FormHelpers, FormSession, SubmitHandler, SubmitOutcome, SubmitState};
pub use validation::{ValidationOrchestrator, ValidationOutcome};
