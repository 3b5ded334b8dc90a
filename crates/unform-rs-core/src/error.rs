//! Core error types for the form engine.
//!
//! Three layers of failure are distinguished:
//!
//! - [`FieldFailure`] / [`AggregateValidationError`]: expected, recoverable
//!   validation failures reported by a schema, one entry per dotted path.
//! - [`SchemaError`]: everything a schema engine can raise. Only the
//!   [`SchemaError::Validation`] variant is absorbed by the form session; all
//!   other variants are defects and propagate to the caller.
//! - [`FormError`]: the error type of the public form API.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// A single validation failure attached to a dotted path.
///
/// # Examples
///
/// ```
/// use unform_rs_core::error::FieldFailure;
///
/// let failure = FieldFailure::new("address.city", "This field is required.", "required");
/// assert_eq!(failure.to_string(), "address.city: This field is required.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    /// Dotted path of the failing value.
    pub path: String,
    /// Human-readable message.
    pub message: String,
    /// A short code identifying the rule that failed (e.g. "required", "email").
    pub code: String,
    /// Additional parameters used to build the message.
    pub params: HashMap<String, String>,
}

impl FieldFailure {
    /// Creates a new failure for `path`.
    pub fn new(path: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code: code.into(),
            params: HashMap::new(),
        }
    }

    /// Adds a parameter to this failure.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A validation error wrapping every per-path failure of one validation run.
///
/// Failures keep the order in which the schema reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateValidationError {
    /// The individual failures, in report order.
    pub inner: Vec<FieldFailure>,
}

impl AggregateValidationError {
    /// Creates an aggregate from a list of failures.
    pub const fn new(inner: Vec<FieldFailure>) -> Self {
        Self { inner }
    }

    /// Appends a failure.
    pub fn push(&mut self, failure: FieldFailure) {
        self.inner.push(failure);
    }

    /// Returns `true` when no failure was collected.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of collected failures.
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl fmt::Display for AggregateValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.len() {
            0 => write!(f, "validation failed"),
            1 => write!(f, "{}", self.inner[0]),
            n => {
                write!(f, "{n} errors occurred: ")?;
                for (i, failure) in self.inner.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{failure}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for AggregateValidationError {}

impl From<Vec<FieldFailure>> for AggregateValidationError {
    fn from(inner: Vec<FieldFailure>) -> Self {
        Self { inner }
    }
}

/// Errors raised by a schema engine.
#[derive(Error, Debug, Clone)]
pub enum SchemaError {
    /// The data did not satisfy the schema. Recoverable.
    #[error("{0}")]
    Validation(AggregateValidationError),

    /// A validation rule itself failed (a defect in the rule, not bad input).
    #[error("Rule '{rule}' failed: {message}")]
    Rule {
        /// Name of the rule.
        rule: String,
        /// Description of the defect.
        message: String,
    },

    /// A value could not be coerced during casting.
    #[error("Cannot cast '{path}': {message}")]
    Cast {
        /// Dotted path of the value.
        path: String,
        /// Description of the problem.
        message: String,
    },

    /// Any other engine failure.
    #[error("Schema error: {0}")]
    Other(String),
}

impl SchemaError {
    /// Returns the aggregate if this is a validation failure.
    pub const fn as_validation(&self) -> Option<&AggregateValidationError> {
        match self {
            Self::Validation(aggregate) => Some(aggregate),
            _ => None,
        }
    }
}

impl From<AggregateValidationError> for SchemaError {
    fn from(e: AggregateValidationError) -> Self {
        Self::Validation(e)
    }
}

/// The error type of the form API.
#[derive(Error, Debug)]
pub enum FormError {
    // ── Registry ─────────────────────────────────────────────────────

    /// A field name is not a valid dotted path.
    #[error("Invalid field path '{0}'")]
    InvalidPath(String),

    /// A field name is a prefix of (or prefixed by) another live field name.
    #[error("Field path '{path}' overlaps registered field '{existing}'")]
    OverlappingPath {
        /// The rejected name.
        path: String,
        /// The registered name it collides with.
        existing: String,
    },

    // ── Submit ───────────────────────────────────────────────────────

    /// A submit was triggered while another one is still running.
    #[error("A submit is already in progress")]
    SubmitInProgress,

    /// The schema raised something other than a validation failure.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A lock guarding form state was poisoned by a panicking thread.
    #[error("Form state poisoned while {0}")]
    StatePoisoned(&'static str),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience type alias for `Result<T, FormError>`.
pub type FormResult<T> = Result<T, FormError>;
