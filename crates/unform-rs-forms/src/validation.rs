//! Validation orchestration for form submission.
//!
//! The [`ValidationOrchestrator`] drives a [`Schema`] over assembled form
//! data:
//!
//! 1. `validate` with `abort_early: false` and `strip_unknown: true`, so every
//!    field's error is collected and undeclared keys are dropped.
//! 2. On success, `cast` the data to the schema's declared types.
//! 3. On a [`SchemaError::Validation`], build a fresh [`ErrorMap`].
//! 4. Any other schema error is a defect and is returned unchanged.
//!
//! Without a schema the assembled data is accepted as-is.

use std::sync::Arc;

use unform_rs_core::error::SchemaError;
use unform_rs_core::schema::{CastOptions, Schema, ValidateOptions};
use unform_rs_core::value::Value;

use crate::error_map::ErrorMap;

/// The result of validating one assembled data object.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// The data passed; carries the cast data.
    Valid(Value),
    /// The data failed; carries one message per failing path.
    Invalid(ErrorMap),
}

impl ValidationOutcome {
    /// Returns `true` for [`ValidationOutcome::Valid`].
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Runs an optional schema over form data with a caller-supplied context.
#[derive(Clone, Default)]
pub struct ValidationOrchestrator {
    schema: Option<Arc<dyn Schema>>,
    context: Value,
}

impl std::fmt::Debug for ValidationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationOrchestrator")
            .field("has_schema", &self.schema.is_some())
            .field("context", &self.context)
            .finish()
    }
}

impl ValidationOrchestrator {
    /// Creates an orchestrator without a schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Sets the context threaded to every schema call.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Returns `true` if a schema is configured.
    pub const fn has_schema(&self) -> bool {
        self.schema.is_some()
    }

    /// The caller context.
    pub const fn context(&self) -> &Value {
        &self.context
    }

    /// Validates and casts `data`.
    ///
    /// # Errors
    ///
    /// Returns the schema's error unchanged when it is anything other than
    /// [`SchemaError::Validation`], or when casting fails.
    pub async fn run(&self, data: Value) -> Result<ValidationOutcome, SchemaError> {
        let Some(schema) = &self.schema else {
            return Ok(ValidationOutcome::Valid(data));
        };

        let validate_options = ValidateOptions::for_submit(self.context.clone());
        match schema.validate(data, &validate_options).await {
            Ok(validated) => {
                let cast_options = CastOptions::for_submit(self.context.clone());
                let cast = schema.cast(validated, &cast_options)?;
                Ok(ValidationOutcome::Valid(cast))
            }
            Err(err) => match err.as_validation() {
                Some(aggregate) => {
                    tracing::debug!(failures = aggregate.len(), "schema rejected form data");
                    Ok(ValidationOutcome::Invalid(ErrorMap::from_aggregate(aggregate)))
                }
                None => Err(err),
            },
        }
    }
}
