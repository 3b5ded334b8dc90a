//! The schema engine boundary.
//!
//! The form engine never interprets validation rules itself. It hands the
//! assembled data to an implementation of [`Schema`] and reacts to the
//! outcome: validated data is cast and delivered, a
//! [`SchemaError::Validation`] is turned into an error map, and any other
//! [`SchemaError`] is returned to the caller untouched.

use async_trait::async_trait;

use crate::error::SchemaError;
use crate::value::Value;

/// Options passed to [`Schema::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateOptions {
    /// Stop at the first failure. The form session always sets this to
    /// `false` so that every field's error is reported.
    pub abort_early: bool,
    /// Drop keys the schema does not declare.
    pub strip_unknown: bool,
    /// Caller-supplied data for conditional rules. Opaque to the form engine.
    pub context: Value,
}

impl ValidateOptions {
    /// Options used by form submission: collect every error, strip unknown
    /// keys.
    pub fn for_submit(context: Value) -> Self {
        Self {
            abort_early: false,
            strip_unknown: true,
            context,
        }
    }
}

/// Options passed to [`Schema::cast`].
#[derive(Debug, Clone, PartialEq)]
pub struct CastOptions {
    /// Drop keys the schema does not declare.
    pub strip_unknown: bool,
    /// Caller-supplied data for conditional rules.
    pub context: Value,
}

impl CastOptions {
    /// Options used by form submission.
    pub const fn for_submit(context: Value) -> Self {
        Self {
            strip_unknown: true,
            context,
        }
    }
}

/// A validation and coercion engine.
///
/// `validate` is async because rules may perform I/O (uniqueness checks and
/// the like). `cast` is a synchronous coercion with no validation side
/// effects.
#[async_trait]
pub trait Schema: Send + Sync {
    /// Validates `data`, returning the (possibly stripped) data on success.
    ///
    /// A failure of the input must be reported as
    /// [`SchemaError::Validation`] carrying every per-path failure when
    /// `options.abort_early` is `false`.
    async fn validate(&self, data: Value, options: &ValidateOptions) -> Result<Value, SchemaError>;

    /// Coerces `data` to the schema's declared types.
    fn cast(&self, data: Value, options: &CastOptions) -> Result<Value, SchemaError>;
}
