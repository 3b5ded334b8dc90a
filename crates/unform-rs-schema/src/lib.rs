//! # unform-rs-schema
//!
//! A reference [`Schema`](unform_rs_core::Schema) implementation. An
//! [`ObjectSchema`] declares typed [`SchemaField`]s; validation coerces loose
//! form input to the declared types, checks built-in constraints and custom
//! tests, and reports every failure under its dotted path.
//!
//! ```
//! use unform_rs_core::schema::{Schema, ValidateOptions};
//! use unform_rs_core::value::Value;
//! use unform_rs_schema::{ObjectSchema, SchemaField};
//!
//! let schema = ObjectSchema::new()
//!     .field(SchemaField::email("email").required(true))
//!     .field(SchemaField::integer("age"));
//! let data = Value::from(serde_json::json!({"email": "bad", "age": "x"}));
//! let options = ValidateOptions::for_submit(Value::object());
//! let err = tokio_test::block_on(schema.validate(data, &options)).unwrap_err();
//! assert_eq!(err.as_validation().unwrap().len(), 2);
//! ```

pub mod object;
pub mod rules;

pub use object::ObjectSchema;
pub use rules::{is_truthy, CustomTest, RuleFailure, RuleKind, SchemaField, TestContext};
