//! Object schemas.
//!
//! An [`ObjectSchema`] declares the fields of one object. Validation walks
//! the declared fields in order, cleans each present value and reports every
//! failure under its full dotted path, nested objects included.

use async_trait::async_trait;

use unform_rs_core::error::{AggregateValidationError, FieldFailure, SchemaError};
use unform_rs_core::schema::{CastOptions, Schema, ValidateOptions};
use unform_rs_core::utils::dotted;
use unform_rs_core::value::{Value, ValueMap};

use crate::rules::SchemaField;

/// A schema over an object with declared fields.
///
/// # Examples
///
/// ```
/// use unform_rs_schema::{ObjectSchema, SchemaField};
///
/// let schema = ObjectSchema::new()
///     .field(SchemaField::string("name").required(true))
///     .field(SchemaField::email("email"));
/// assert_eq!(schema.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: Vec<SchemaField>,
}

impl ObjectSchema {
    /// Creates a schema with no fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field. A field with the same name is replaced in place.
    #[must_use]
    pub fn field(mut self, field: SchemaField) -> Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// The declared fields in declaration order.
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// The field named `name`.
    pub fn get(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no field is declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validates `data` as the object at `prefix`.
    ///
    /// Absent optional fields stay absent; absent required fields fail.
    pub(crate) fn validate_at(
        &self,
        prefix: &str,
        data: &ValueMap,
        options: &ValidateOptions,
        failures: &mut Vec<FieldFailure>,
    ) -> Result<ValueMap, SchemaError> {
        let parent = Value::Object(data.clone());
        let mut out = if options.strip_unknown {
            ValueMap::new()
        } else {
            data.clone()
        };

        for field in &self.fields {
            let path = dotted::join(prefix, &field.name);
            let raw = data.get(&field.name).unwrap_or(&Value::Undefined);
            let cleaned = field.clean(&path, raw, &parent, options, failures)?;
            if data.contains_key(&field.name) {
                out.insert(field.name.clone(), cleaned);
            }
            if options.abort_early && !failures.is_empty() {
                break;
            }
        }
        Ok(out)
    }

    pub(crate) fn cast_map(&self, data: &ValueMap, strip_unknown: bool) -> ValueMap {
        let mut out = if strip_unknown {
            ValueMap::new()
        } else {
            data.clone()
        };
        for field in &self.fields {
            if let Some(raw) = data.get(&field.name) {
                out.insert(field.name.clone(), field.cast(raw, strip_unknown));
            }
        }
        out
    }
}

fn expect_object(data: Value) -> Result<ValueMap, SchemaError> {
    match data {
        Value::Object(map) => Ok(map),
        Value::Undefined | Value::Null => Ok(ValueMap::new()),
        other => Err(SchemaError::Cast {
            path: String::new(),
            message: format!("expected an object, got {other}"),
        }),
    }
}

#[async_trait]
impl Schema for ObjectSchema {
    async fn validate(&self, data: Value, options: &ValidateOptions) -> Result<Value, SchemaError> {
        let data = expect_object(data)?;
        let mut failures = Vec::new();
        let cleaned = self.validate_at("", &data, options, &mut failures)?;
        if failures.is_empty() {
            Ok(Value::Object(cleaned))
        } else {
            tracing::debug!(failures = failures.len(), "object schema rejected data");
            Err(AggregateValidationError::new(failures).into())
        }
    }

    fn cast(&self, data: Value, options: &CastOptions) -> Result<Value, SchemaError> {
        let data = expect_object(data)?;
        Ok(Value::Object(self.cast_map(&data, options.strip_unknown)))
    }
}
