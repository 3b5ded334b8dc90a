//! Field rules and type coercion.
//!
//! Each [`SchemaField`] pairs a name with a [`RuleKind`] and its modifiers.
//! Cleaning a field runs, in order: the required check, type coercion, the
//! kind's built-in constraints, then the field's custom tests. Coercion
//! accepts the loose input a form produces (`"30"` for an integer, `"on"`
//! for a boolean) and yields the declared type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use unform_rs_core::error::{FieldFailure, SchemaError};
use unform_rs_core::schema::ValidateOptions;
use unform_rs_core::value::Value;

use crate::object::ObjectSchema;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("valid regex"));

/// The outcome of a failed custom test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleFailure {
    /// The value is invalid; carries the message shown to the user.
    Invalid(String),
    /// The test itself broke. Surfaces as [`SchemaError::Rule`] instead of a
    /// field error.
    Defect(String),
}

/// What a custom test can see besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct TestContext<'a> {
    /// Full dotted path of the field under test.
    pub path: &'a str,
    /// The object the field belongs to, as submitted.
    pub parent: &'a Value,
    /// The caller context of the validation run.
    pub context: &'a Value,
}

/// A custom test over a coerced value.
pub type CustomTest = Arc<dyn Fn(&Value, &TestContext<'_>) -> Result<(), RuleFailure> + Send + Sync>;

/// The type of a schema field and its type-specific constraints.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// A string.
    String {
        /// Minimum length in characters.
        min_length: Option<usize>,
        /// Maximum length in characters.
        max_length: Option<usize>,
        /// Whether to strip leading and trailing whitespace.
        trim: bool,
    },
    /// A whole number.
    Integer {
        /// Minimum allowed value.
        min: Option<i64>,
        /// Maximum allowed value.
        max: Option<i64>,
    },
    /// A floating-point number.
    Float {
        /// Minimum allowed value.
        min: Option<f64>,
        /// Maximum allowed value.
        max: Option<f64>,
    },
    /// A boolean.
    Boolean,
    /// An email address.
    Email,
    /// An http(s) URL.
    Url,
    /// A UUID, normalized to its lowercase hyphenated form.
    Uuid,
    /// A string matching a pattern.
    Regex(Regex),
    /// A nested object.
    Object(ObjectSchema),
}

impl RuleKind {
    /// A trimmed string without length limits.
    pub const fn string() -> Self {
        Self::String {
            min_length: None,
            max_length: None,
            trim: true,
        }
    }

    /// An unbounded integer.
    pub const fn integer() -> Self {
        Self::Integer {
            min: None,
            max: None,
        }
    }

    /// An unbounded float.
    pub const fn float() -> Self {
        Self::Float {
            min: None,
            max: None,
        }
    }

    /// Converts `value` to this kind's type, or `None` if it cannot be.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match self {
            Self::String { trim, .. } => {
                let text = to_text(value)?;
                Some(Value::String(if *trim {
                    text.trim().to_string()
                } else {
                    text
                }))
            }
            Self::Integer { .. } => match value {
                Value::Int(n) => Some(Value::Int(*n)),
                #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
                Value::Float(f)
                    if f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f) =>
                {
                    Some(Value::Int(*f as i64))
                }
                Value::String(s) => s.trim().parse::<i64>().ok().map(Value::Int),
                _ => None,
            },
            Self::Float { .. } => match value {
                Value::Float(f) => Some(Value::Float(*f)),
                #[allow(clippy::cast_precision_loss)]
                Value::Int(n) => Some(Value::Float(*n as f64)),
                Value::String(s) => s.trim().parse::<f64>().ok().map(Value::Float),
                _ => None,
            },
            Self::Boolean => match value {
                Value::Bool(b) => Some(Value::Bool(*b)),
                Value::Int(1) => Some(Value::Bool(true)),
                Value::Int(0) => Some(Value::Bool(false)),
                Value::String(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
                    "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
            Self::Email | Self::Url | Self::Regex(_) => match value {
                Value::String(s) => Some(Value::String(s.trim().to_string())),
                _ => None,
            },
            Self::Uuid => match value {
                Value::String(s) => Some(
                    uuid::Uuid::parse_str(s.trim())
                        .map_or_else(|_| Value::String(s.clone()), |u| Value::String(u.to_string())),
                ),
                _ => None,
            },
            Self::Object(_) => match value {
                Value::Object(_) => Some(value.clone()),
                _ => None,
            },
        }
    }

    fn invalid_message(&self) -> &'static str {
        match self {
            Self::String { .. } => "Enter a valid string.",
            Self::Integer { .. } => "Enter a whole number.",
            Self::Float { .. } => "Enter a number.",
            Self::Boolean => "Enter a valid boolean.",
            Self::Email => "Enter a valid email address.",
            Self::Url => "Enter a valid URL.",
            Self::Uuid => "Enter a valid UUID.",
            Self::Regex(_) => "Enter a valid value.",
            Self::Object(_) => "Enter a valid object.",
        }
    }

    fn check(&self, value: &Value) -> Vec<Violation> {
        let mut failures = Vec::new();
        match (self, value) {
            (
                Self::String {
                    min_length,
                    max_length,
                    ..
                },
                Value::String(s),
            ) => {
                let len = s.chars().count();
                if let Some(min) = min_length.filter(|min| len < *min) {
                    failures.push(
                        Violation::new(
                            "min_length",
                            format!("Ensure this value has at least {min} characters (it has {len})."),
                        )
                        .param("limit", min.to_string()),
                    );
                }
                if let Some(max) = max_length.filter(|max| len > *max) {
                    failures.push(
                        Violation::new(
                            "max_length",
                            format!("Ensure this value has at most {max} characters (it has {len})."),
                        )
                        .param("limit", max.to_string()),
                    );
                }
            }
            (Self::Integer { min, max }, Value::Int(n)) => {
                if let Some(min) = min.filter(|min| n < min) {
                    failures.push(min_value_failure(&min));
                }
                if let Some(max) = max.filter(|max| n > max) {
                    failures.push(max_value_failure(&max));
                }
            }
            (Self::Float { min, max }, Value::Float(n)) => {
                if let Some(min) = min.filter(|min| n < min) {
                    failures.push(min_value_failure(&min));
                }
                if let Some(max) = max.filter(|max| n > max) {
                    failures.push(max_value_failure(&max));
                }
            }
            (Self::Email, Value::String(s)) if !EMAIL_RE.is_match(s) => {
                failures.push(Violation::new("invalid", self.invalid_message()));
            }
            (Self::Url, Value::String(s)) if !URL_RE.is_match(s) => {
                failures.push(Violation::new("invalid", self.invalid_message()));
            }
            (Self::Uuid, Value::String(s)) if uuid::Uuid::parse_str(s).is_err() => {
                failures.push(Violation::new("invalid", self.invalid_message()));
            }
            (Self::Regex(re), Value::String(s)) if !re.is_match(s) => {
                failures.push(
                    Violation::new("invalid", self.invalid_message())
                        .param("pattern", re.as_str().to_string()),
                );
            }
            _ => {}
        }
        failures
    }
}

/// A failed built-in constraint.
struct Violation {
    code: &'static str,
    message: String,
    params: Vec<(&'static str, String)>,
}

impl Violation {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            params: Vec::new(),
        }
    }

    fn param(mut self, key: &'static str, value: String) -> Self {
        self.params.push((key, value));
        self
    }
}

fn min_value_failure<T: fmt::Display>(min: &T) -> Violation {
    Violation::new(
        "min_value",
        format!("Ensure this value is greater than or equal to {min}."),
    )
    .param("limit", min.to_string())
}

fn max_value_failure<T: fmt::Display>(max: &T) -> Violation {
    Violation::new(
        "max_value",
        format!("Ensure this value is less than or equal to {max}."),
    )
    .param("limit", max.to_string())
}

fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => Some(value.to_string()),
        _ => None,
    }
}

/// Loose truthiness of a context value, used by conditional requirements.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(n) => *n != 0,
        Value::Float(f) => *f != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::List(_) | Value::Object(_) => true,
    }
}

/// One declared field of an [`ObjectSchema`].
#[derive(Clone)]
pub struct SchemaField {
    /// The key inside the parent object.
    pub name: String,
    /// The field type.
    pub kind: RuleKind,
    /// Whether an empty value is a failure.
    pub required: bool,
    /// A caller-context key that makes the field required when truthy.
    pub required_when: Option<String>,
    /// Message overrides keyed by failure code.
    pub messages: HashMap<String, String>,
    /// Custom tests, keyed by the code they report.
    pub tests: Vec<(String, CustomTest)>,
}

impl fmt::Debug for SchemaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaField")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("required_when", &self.required_when)
            .field("messages", &self.messages)
            .field(
                "tests",
                &self.tests.iter().map(|(code, _)| code).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl SchemaField {
    /// Creates an optional field of the given kind.
    pub fn new(name: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            required_when: None,
            messages: HashMap::new(),
            tests: Vec::new(),
        }
    }

    /// A trimmed string field.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, RuleKind::string())
    }

    /// An integer field.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, RuleKind::integer())
    }

    /// A float field.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, RuleKind::float())
    }

    /// A boolean field.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, RuleKind::Boolean)
    }

    /// An email field.
    pub fn email(name: impl Into<String>) -> Self {
        Self::new(name, RuleKind::Email)
    }

    /// A URL field.
    pub fn url(name: impl Into<String>) -> Self {
        Self::new(name, RuleKind::Url)
    }

    /// A UUID field.
    pub fn uuid(name: impl Into<String>) -> Self {
        Self::new(name, RuleKind::Uuid)
    }

    /// A nested object field.
    pub fn object(name: impl Into<String>, schema: ObjectSchema) -> Self {
        Self::new(name, RuleKind::Object(schema))
    }

    /// A field matched against `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Other`] if the pattern does not compile.
    pub fn regex(name: impl Into<String>, pattern: &str) -> Result<Self, SchemaError> {
        let re = Regex::new(pattern)
            .map_err(|e| SchemaError::Other(format!("invalid pattern '{pattern}': {e}")))?;
        Ok(Self::new(name, RuleKind::Regex(re)))
    }

    /// Sets whether the field is required.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Makes the field required when `context_key` is truthy in the caller
    /// context.
    #[must_use]
    pub fn required_when(mut self, context_key: impl Into<String>) -> Self {
        self.required_when = Some(context_key.into());
        self
    }

    /// Overrides the message reported for `code`.
    #[must_use]
    pub fn message(mut self, code: impl Into<String>, msg: impl Into<String>) -> Self {
        self.messages.insert(code.into(), msg.into());
        self
    }

    /// Adds a custom test reported under `code`.
    #[must_use]
    pub fn test<F>(mut self, code: impl Into<String>, test: F) -> Self
    where
        F: Fn(&Value, &TestContext<'_>) -> Result<(), RuleFailure> + Send + Sync + 'static,
    {
        self.tests.push((code.into(), Arc::new(test)));
        self
    }

    /// Returns `true` if an empty value fails under `context`.
    pub fn is_required(&self, context: &Value) -> bool {
        self.required
            || self
                .required_when
                .as_deref()
                .is_some_and(|key| context.get(key).is_some_and(is_truthy))
    }

    fn failure(&self, path: &str, code: &str, default: String) -> FieldFailure {
        let message = self.messages.get(code).cloned().unwrap_or(default);
        FieldFailure::new(path, message, code)
    }

    /// Validates and coerces `raw`, pushing every failure onto `failures`.
    ///
    /// Returns the cleaned value, or `raw` unchanged when it could not be
    /// coerced.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Rule`] when a custom test reports a defect.
    pub(crate) fn clean(
        &self,
        path: &str,
        raw: &Value,
        parent: &Value,
        options: &ValidateOptions,
        failures: &mut Vec<FieldFailure>,
    ) -> Result<Value, SchemaError> {
        let trimmed_empty = matches!(
            (&self.kind, raw),
            (RuleKind::String { trim: true, .. }, Value::String(s)) if s.trim().is_empty()
        );
        if raw.is_empty() || trimmed_empty {
            if self.is_required(&options.context) {
                failures.push(self.failure(path, "required", "This field is required.".into()));
            }
            return Ok(raw.clone());
        }

        if let RuleKind::Object(schema) = &self.kind {
            let Value::Object(map) = raw else {
                failures.push(self.failure(path, "invalid", self.kind.invalid_message().into()));
                return Ok(raw.clone());
            };
            return schema
                .validate_at(path, map, options, failures)
                .map(Value::Object);
        }

        let Some(value) = self.kind.coerce(raw) else {
            failures.push(self.failure(path, "invalid", self.kind.invalid_message().into()));
            return Ok(raw.clone());
        };

        let before = failures.len();
        for violation in self.kind.check(&value) {
            let failure = violation.params.into_iter().fold(
                self.failure(path, violation.code, violation.message),
                |f, (k, v)| f.with_param(k, v),
            );
            failures.push(failure);
            if options.abort_early {
                return Ok(value);
            }
        }
        if failures.len() > before {
            return Ok(value);
        }

        let ctx = TestContext {
            path,
            parent,
            context: &options.context,
        };
        for (code, test) in &self.tests {
            match test(&value, &ctx) {
                Ok(()) => {}
                Err(RuleFailure::Invalid(message)) => {
                    failures.push(self.failure(path, code, message));
                    if options.abort_early {
                        break;
                    }
                }
                Err(RuleFailure::Defect(message)) => {
                    return Err(SchemaError::Rule {
                        rule: code.clone(),
                        message,
                    });
                }
            }
        }
        Ok(value)
    }

    /// Coerces `raw` without validating. Values that cannot be coerced are
    /// returned unchanged.
    pub(crate) fn cast(&self, raw: &Value, strip_unknown: bool) -> Value {
        match (&self.kind, raw) {
            (RuleKind::Object(schema), Value::Object(map)) => {
                Value::Object(schema.cast_map(map, strip_unknown))
            }
            (_, value) if value.is_empty() => value.clone(),
            (kind, value) => kind.coerce(value).unwrap_or_else(|| value.clone()),
        }
    }
}
