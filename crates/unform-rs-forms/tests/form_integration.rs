//! Integration tests for the Field -> Session -> Schema pipeline.
//!
//! These tests drive a [`FormSession`] with the reference object schema,
//! covering:
//! 1. Submission scenarios (success, partial failure, unknown-field stripping)
//! 2. Error publication to scoped contexts
//! 3. Reset behavior
//! 4. Registry modes and registration rules

use std::sync::{Arc, Mutex};

use serde_json::json;

use unform_rs_core::error::{FormError, SchemaError};
use unform_rs_core::settings::{FormSettings, RegistryMode};
use unform_rs_core::value::Value;
use unform_rs_forms::field::{FieldCell, FieldHandle};
use unform_rs_forms::session::{FormSession, SubmitOutcome};
use unform_rs_schema::{ObjectSchema, RuleFailure, RuleKind, SchemaField};

// ============================================================================
// Shared helpers
// ============================================================================

/// A signup schema with a nested address.
fn signup_schema() -> ObjectSchema {
    ObjectSchema::new()
        .field(SchemaField::string("name").required(true))
        .field(SchemaField::email("email"))
        .field(SchemaField::new(
            "age",
            RuleKind::Integer {
                min: Some(0),
                max: Some(150),
            },
        ))
        .field(SchemaField::object(
            "address",
            ObjectSchema::new().field(SchemaField::string("city").required(true)),
        ))
}

/// Collects every payload delivered to the submit handler.
fn recording_form(settings: FormSettings) -> (FormSession, Arc<Mutex<Vec<Value>>>) {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    let form = FormSession::new(settings)
        .with_schema(signup_schema())
        .on_submit(move |data, _| sink.lock().unwrap().push(data));
    (form, delivered)
}

fn field(form: &FormSession, name: &str, value: impl Into<Value>) -> FieldCell {
    let cell = FieldCell::new(value);
    form.register_field(FieldHandle::from_cell(name, cell.clone()))
        .unwrap();
    cell
}

// ============================================================================
// 1. Submission scenarios
// ============================================================================

#[tokio::test]
async fn test_successful_submit_delivers_nested_data() {
    let (form, delivered) = recording_form(FormSettings::default());
    field(&form, "name", "Alice");
    field(&form, "address.city", "Rome");

    let outcome = form.submit().await.unwrap();
    let expected = json!({"name": "Alice", "address": {"city": "Rome"}});
    assert_eq!(outcome.data().unwrap().to_json(), expected);
    let delivered = delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].to_json(), expected);
    assert!(form.errors().is_empty());
}

#[tokio::test]
async fn test_partial_failure_reports_only_bad_field() {
    let (form, delivered) = recording_form(FormSettings::default());
    field(&form, "name", "Alice");
    field(&form, "email", "not-an-email");
    field(&form, "age", "30");
    field(&form, "address.city", "Rome");

    let outcome = form.submit().await.unwrap();
    let errors = outcome.errors().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.get("email"), Some("Enter a valid email address."));
    assert!(delivered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_fields_are_stripped_and_values_cast() {
    let (form, delivered) = recording_form(FormSettings::default());
    field(&form, "name", "Alice");
    field(&form, "age", "30");
    field(&form, "address.city", "Rome");
    field(&form, "leftoverDebugField", "debug");

    form.submit().await.unwrap();
    let data = delivered.lock().unwrap()[0].clone();
    assert_eq!(data.get("leftoverDebugField"), None);
    assert_eq!(data.get("age"), Some(&Value::Int(30)));
}

#[tokio::test]
async fn test_all_errors_are_collected() {
    let (form, _) = recording_form(FormSettings::default());
    field(&form, "name", "");
    field(&form, "email", "nope");
    field(&form, "age", "x");
    field(&form, "address.city", "");

    let outcome = form.submit().await.unwrap();
    let errors = outcome.errors().unwrap();
    let paths: Vec<&str> = errors.iter().map(|(path, _)| path).collect();
    assert_eq!(paths, vec!["address.city", "age", "email", "name"]);
}

#[tokio::test]
async fn test_errors_are_replaced_between_attempts() {
    let (form, _) = recording_form(FormSettings::default());
    let name = field(&form, "name", "");
    let city = field(&form, "address.city", "Rome");

    form.submit().await.unwrap();
    assert_eq!(form.errors().iter().map(|(p, _)| p).collect::<Vec<_>>(), vec!["name"]);

    name.set(Value::from("Alice"));
    city.set(Value::from(""));
    form.submit().await.unwrap();
    assert_eq!(
        form.errors().iter().map(|(p, _)| p).collect::<Vec<_>>(),
        vec!["address.city"]
    );
}

#[tokio::test]
async fn test_context_threads_to_conditional_rules() {
    let schema = ObjectSchema::new().field(SchemaField::string("vat").required_when("business"));
    let form = FormSession::new(FormSettings::default())
        .with_schema(schema)
        .with_context(Value::from(json!({"business": true})));
    field(&form, "vat", "");
    let outcome = form.submit().await.unwrap();
    assert!(outcome.errors().unwrap().contains("vat"));
}

#[tokio::test]
async fn test_rule_defect_propagates_and_keeps_errors() {
    let schema = ObjectSchema::new()
        .field(SchemaField::string("name").required(true))
        .field(SchemaField::string("code").test("lookup", |v, _| {
            if v.as_str() == Some("crash") {
                Err(RuleFailure::Defect("lookup table missing".into()))
            } else {
                Ok(())
            }
        }));
    let form = FormSession::new(FormSettings::default()).with_schema(schema);
    let name = field(&form, "name", "");
    let code = field(&form, "code", "ok");

    form.submit().await.unwrap();
    assert!(form.errors().contains("name"));

    name.set(Value::from("Alice"));
    code.set(Value::from("crash"));
    let err = form.submit().await.unwrap_err();
    assert!(matches!(err, FormError::Schema(SchemaError::Rule { .. })));
    assert!(form.errors().contains("name"));
}

// ============================================================================
// 2. Error publication to contexts
// ============================================================================

#[tokio::test]
async fn test_scoped_context_sees_nested_errors() {
    let (form, _) = recording_form(FormSettings::default());
    let root = form.context();
    let address = root.scope("address").unwrap();
    address
        .register_field(FieldHandle::from_cell("city", FieldCell::new("")))
        .unwrap();
    root.register_field(FieldHandle::from_cell("name", FieldCell::new("Alice")))
        .unwrap();

    let mut watcher = address.clone();
    let outcome = form.submit().await.unwrap();
    assert!(!outcome.is_submitted());

    assert!(address.is_stale());
    assert_eq!(address.error("city"), None);
    assert!(watcher.changed().await);
    assert_eq!(watcher.error("city"), Some("This field is required."));
    assert_eq!(watcher.errors().within("address").len(), 1);
    assert_eq!(form.errors().within("address").get("city"), Some("This field is required."));
}

#[tokio::test]
async fn test_initial_data_reaches_fields() {
    let form = FormSession::new(FormSettings::default())
        .with_initial_data(Value::from(json!({"address": {"city": "Rome"}})));
    let address = form.context().scope("address").unwrap();
    let seed = address.initial_value("city");
    address
        .register_field(FieldHandle::from_cell("city", FieldCell::new(seed)))
        .unwrap();
    let outcome = form.submit().await.unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::Submitted(Value::from(json!({"address": {"city": "Rome"}})))
    );
}

// ============================================================================
// 3. Reset
// ============================================================================

#[tokio::test]
async fn test_handler_resets_after_success() {
    let form = FormSession::new(FormSettings::default())
        .with_schema(signup_schema())
        .on_submit(|_, helpers| {
            helpers.reset_form().unwrap();
        });
    let name = field(&form, "name", "Alice");
    let city = field(&form, "address.city", "Rome");

    assert!(form.submit().await.unwrap().is_submitted());
    assert_eq!(name.get(), Value::from(""));
    assert_eq!(city.get(), Value::from(""));

    form.reset_form().unwrap();
    assert_eq!(name.get(), Value::from(""));
}

// ============================================================================
// 4. Registry modes and registration rules
// ============================================================================

#[tokio::test]
async fn test_registry_modes_agree() {
    let mut results = Vec::new();
    for mode in [RegistryMode::Snapshot, RegistryMode::Accumulator] {
        let (form, _) = recording_form(FormSettings::default().with_registry_mode(mode));
        field(&form, "address.city", "Rome");
        field(&form, "name", "Alice");
        field(&form, "tmp", "x");
        assert!(form.unregister_field("tmp").unwrap());
        results.push(form.submit().await.unwrap());
    }
    assert_eq!(results[0], results[1]);
}

#[test]
fn test_overlapping_names_are_rejected() {
    let form = FormSession::new(FormSettings::default());
    field(&form, "address", "flat");
    let err = form
        .register_field(FieldHandle::from_cell("address.city", FieldCell::new("Rome")))
        .unwrap_err();
    assert!(matches!(err, FormError::OverlappingPath { .. }));
}

#[tokio::test]
async fn test_overlap_allowed_when_configured() {
    let form = FormSession::new(FormSettings::default().with_reject_overlapping_paths(false));
    field(&form, "address", "flat");
    field(&form, "address.city", "Rome");
    let outcome = form.submit().await.unwrap();
    assert_eq!(
        outcome.data().unwrap().to_json(),
        json!({"address": {"city": "Rome"}})
    );
}

#[test]
fn test_unregistered_field_is_not_assembled() {
    let form = FormSession::new(FormSettings::default());
    field(&form, "a", "1");
    field(&form, "b", "2");
    assert!(form.unregister_field("a").unwrap());
    assert!(!form.unregister_field("a").unwrap());
    assert_eq!(form.field_names().unwrap(), vec!["b"]);
}
