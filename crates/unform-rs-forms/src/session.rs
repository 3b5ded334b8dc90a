//! Form sessions: the top-level object of one form instance.
//!
//! A [`FormSession`] owns the field registry, the published error map and
//! the submit state machine. The rendering layer hands
//! [`FormSession::context`] to its fields and calls
//! [`FormSession::submit`] on the form's submission trigger.
//!
//! ## Submit lifecycle
//!
//! ```text
//! Idle -> Assembling -> Validating -> Succeeded -> Idle
//!                                  \-> Failed    -> Idle
//! ```
//!
//! `Validating` is skipped when no schema is configured. Only one submit may
//! be in flight; a second call returns [`FormError::SubmitInProgress`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;
use tracing::Instrument;

use unform_rs_core::error::{FormError, FormResult};
use unform_rs_core::logging::submit_span;
use unform_rs_core::schema::Schema;
use unform_rs_core::settings::FormSettings;
use unform_rs_core::value::Value;

use crate::assembler;
use crate::context::ScopedContext;
use crate::error_map::{ErrorMap, ErrorState};
use crate::field::FieldHandle;
use crate::registry::{create_registry, FieldRegistry};
use crate::validation::{ValidationOrchestrator, ValidationOutcome};

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

/// The caller's submit callback.
pub type SubmitHandler = Arc<dyn Fn(Value, &FormHelpers) + Send + Sync>;

/// The state of the submit state machine.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SubmitState {
    /// Ready for a submit.
    #[default]
    Idle,
    /// Reading fields into a data object.
    Assembling,
    /// Waiting on the schema.
    Validating,
    /// Data accepted; the handler is being invoked.
    Succeeded,
    /// Data rejected; the new error map has been published.
    Failed,
}

/// The result of a submit that did not hit an unexpected error.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The data was accepted and handed to the submit handler.
    Submitted(Value),
    /// The data was rejected; carries the published error map.
    Rejected(ErrorMap),
}

impl SubmitOutcome {
    /// Returns `true` for [`SubmitOutcome::Submitted`].
    pub const fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted(_))
    }

    /// The delivered data, if accepted.
    pub const fn data(&self) -> Option<&Value> {
        match self {
            Self::Submitted(data) => Some(data),
            Self::Rejected(_) => None,
        }
    }

    /// The error map, if rejected.
    pub const fn errors(&self) -> Option<&ErrorMap> {
        match self {
            Self::Submitted(_) => None,
            Self::Rejected(errors) => Some(errors),
        }
    }
}

/// Capabilities handed to the submit handler alongside the data.
#[derive(Clone)]
pub struct FormHelpers {
    registry: Arc<dyn FieldRegistry>,
    reset_value: Value,
}

impl fmt::Debug for FormHelpers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormHelpers")
            .field("reset_value", &self.reset_value)
            .finish_non_exhaustive()
    }
}

impl FormHelpers {
    /// Clears every registered field. Does not validate and does not touch
    /// the error map. Returns the number of fields cleared.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::StatePoisoned`] if the registry lock is poisoned.
    pub fn reset_form(&self) -> FormResult<usize> {
        let snapshot = self.registry.snapshot()?;
        let cleared = snapshot
            .iter()
            .filter(|handle| handle.reset(&self.reset_value))
            .count();
        tracing::debug!(cleared, "form reset");
        Ok(cleared)
    }
}

/// One form instance.
///
/// # Examples
///
/// ```
/// use unform_rs_core::settings::FormSettings;
/// use unform_rs_core::value::Value;
/// use unform_rs_forms::field::{FieldCell, FieldHandle};
/// use unform_rs_forms::session::FormSession;
///
/// # tokio_test::block_on(async {
/// let form = FormSession::new(FormSettings::default());
/// form.register_field(FieldHandle::from_cell("name", FieldCell::new("Alice"))).unwrap();
/// let outcome = form.submit().await.unwrap();
/// assert_eq!(outcome.data().and_then(|d| d.get("name")), Some(&Value::from("Alice")));
/// # });
/// ```
pub struct FormSession {
    id: u64,
    settings: FormSettings,
    registry: Arc<dyn FieldRegistry>,
    orchestrator: ValidationOrchestrator,
    initial_data: Arc<Value>,
    on_submit: Option<SubmitHandler>,
    errors: watch::Sender<ErrorState>,
    state: RwLock<SubmitState>,
    in_flight: AtomicBool,
    submit_count: AtomicU64,
}

impl fmt::Debug for FormSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSession")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .field("orchestrator", &self.orchestrator)
            .field("state", &self.submit_state())
            .finish_non_exhaustive()
    }
}

impl FormSession {
    /// Creates a session with no schema, no initial data and no handler.
    pub fn new(settings: FormSettings) -> Self {
        let registry = create_registry(&settings);
        let (errors, _) = watch::channel(ErrorState::default());
        Self {
            id: FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst),
            settings,
            registry,
            orchestrator: ValidationOrchestrator::new(),
            initial_data: Arc::new(Value::object()),
            on_submit: None,
            errors,
            state: RwLock::new(SubmitState::Idle),
            in_flight: AtomicBool::new(false),
            submit_count: AtomicU64::new(0),
        }
    }

    /// Sets the schema used to validate and cast submitted data.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Schema + 'static) -> Self {
        self.orchestrator = self.orchestrator.with_schema(Arc::new(schema));
        self
    }

    /// Sets a shared schema.
    #[must_use]
    pub fn with_shared_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.orchestrator = self.orchestrator.with_schema(schema);
        self
    }

    /// Sets the caller context threaded to every schema call.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<Value>) -> Self {
        self.orchestrator = self.orchestrator.with_context(context.into());
        self
    }

    /// Sets the initial data exposed to fields through the context.
    #[must_use]
    pub fn with_initial_data(mut self, initial_data: impl Into<Value>) -> Self {
        self.initial_data = Arc::new(initial_data.into());
        self
    }

    /// Sets the submit handler invoked with accepted data.
    #[must_use]
    pub fn on_submit<F>(mut self, handler: F) -> Self
    where
        F: Fn(Value, &FormHelpers) + Send + Sync + 'static,
    {
        self.on_submit = Some(Arc::new(handler));
        self
    }

    /// A process-unique identifier of this session.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The settings this session was created with.
    pub const fn settings(&self) -> &FormSettings {
        &self.settings
    }

    /// The context to hand to top-level fields.
    pub fn context(&self) -> ScopedContext {
        ScopedContext::root(
            Arc::clone(&self.initial_data),
            Arc::clone(&self.registry),
            self.errors.subscribe(),
        )
    }

    /// Registers a top-level field.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidPath`] or [`FormError::OverlappingPath`]
    /// when the name is not admissible.
    pub fn register_field(&self, handle: FieldHandle) -> FormResult<()> {
        self.registry.register(handle)
    }

    /// Unregisters a top-level field. Unknown names are ignored.
    pub fn unregister_field(&self, name: &str) -> FormResult<bool> {
        self.registry.unregister(name)
    }

    /// The currently registered names.
    pub fn field_names(&self) -> FormResult<Vec<String>> {
        Ok(self.registry.snapshot()?.names())
    }

    /// The currently published error map.
    pub fn errors(&self) -> Arc<ErrorMap> {
        Arc::clone(&self.errors.borrow().errors)
    }

    /// A receiver notified on every error map publication.
    pub fn subscribe_errors(&self) -> watch::Receiver<ErrorState> {
        self.errors.subscribe()
    }

    /// The current state of the submit state machine.
    pub fn submit_state(&self) -> SubmitState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// The number of submit attempts started so far.
    pub fn submit_count(&self) -> u64 {
        self.submit_count.load(Ordering::SeqCst)
    }

    /// The reset capability, also handed to the submit handler.
    pub fn helpers(&self) -> FormHelpers {
        FormHelpers {
            registry: Arc::clone(&self.registry),
            reset_value: self.settings.reset_value.clone(),
        }
    }

    /// Clears every registered field. See [`FormHelpers::reset_form`].
    pub fn reset_form(&self) -> FormResult<usize> {
        self.helpers().reset_form()
    }

    /// Assembles, validates and delivers the form data.
    ///
    /// On acceptance the error map is cleared and the submit handler is
    /// called with the cast data. On rejection the new error map is published
    /// and the handler is not called.
    ///
    /// # Errors
    ///
    /// - [`FormError::SubmitInProgress`] if another submit is running.
    /// - [`FormError::Schema`] if the schema raised anything other than a
    ///   validation failure. The error map is left untouched.
    pub async fn submit(&self) -> FormResult<SubmitOutcome> {
        let _guard = InFlight::acquire(self)?;
        let attempt = self.submit_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.run_submit()
            .instrument(submit_span(self.id, attempt))
            .await
    }

    async fn run_submit(&self) -> FormResult<SubmitOutcome> {
        self.transition(SubmitState::Assembling);
        let snapshot = self.registry.snapshot()?;
        let data = assembler::assemble(&snapshot);

        if self.orchestrator.has_schema() {
            self.transition(SubmitState::Validating);
        }
        let outcome = match self.orchestrator.run(data).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(error = %err, "schema raised an unexpected error");
                return Err(FormError::Schema(err));
            }
        };

        match outcome {
            ValidationOutcome::Valid(data) => {
                self.transition(SubmitState::Succeeded);
                self.publish(ErrorMap::new());
                if let Some(handler) = &self.on_submit {
                    handler(data.clone(), &self.helpers());
                }
                Ok(SubmitOutcome::Submitted(data))
            }
            ValidationOutcome::Invalid(errors) => {
                self.transition(SubmitState::Failed);
                tracing::info!(failures = errors.len(), "form submission rejected");
                self.publish(errors.clone());
                Ok(SubmitOutcome::Rejected(errors))
            }
        }
    }

    fn publish(&self, errors: ErrorMap) {
        let errors = Arc::new(errors);
        self.errors.send_modify(|state| {
            state.generation += 1;
            state.errors = errors;
        });
    }

    fn transition(&self, next: SubmitState) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(from = ?*state, to = ?next, "submit state");
        *state = next;
    }
}

/// Marks a submit as in flight; returns the session to `Idle` when dropped,
/// including when the submit future is dropped mid-validation.
struct InFlight<'a> {
    session: &'a FormSession,
}

impl<'a> InFlight<'a> {
    fn acquire(session: &'a FormSession) -> FormResult<Self> {
        if session
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(FormError::SubmitInProgress);
        }
        Ok(Self { session })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.session.transition(SubmitState::Idle);
        self.session.in_flight.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    use super::*;
    use crate::field::FieldCell;
    use unform_rs_core::error::{AggregateValidationError, FieldFailure, SchemaError};
    use unform_rs_core::schema::{CastOptions, ValidateOptions};
    use unform_rs_core::settings::RegistryMode;

    /// Fails every listed path whose value is an empty string.
    struct RequiredFields(Vec<&'static str>);

    #[async_trait]
    impl Schema for RequiredFields {
        async fn validate(&self, data: Value, _: &ValidateOptions) -> Result<Value, SchemaError> {
            let failures: Vec<FieldFailure> = self
                .0
                .iter()
                .filter(|path| {
                    unform_rs_core::utils::dotted::lookup(path, &data).map_or(true, Value::is_empty)
                })
                .map(|path| FieldFailure::new(*path, "Required.", "required"))
                .collect();
            if failures.is_empty() {
                Ok(data)
            } else {
                Err(AggregateValidationError::new(failures).into())
            }
        }

        fn cast(&self, data: Value, _: &CastOptions) -> Result<Value, SchemaError> {
            Ok(data)
        }
    }

    /// Blocks validation until notified.
    struct Gate(Arc<Notify>);

    #[async_trait]
    impl Schema for Gate {
        async fn validate(&self, data: Value, _: &ValidateOptions) -> Result<Value, SchemaError> {
            self.0.notified().await;
            Ok(data)
        }

        fn cast(&self, data: Value, _: &CastOptions) -> Result<Value, SchemaError> {
            Ok(data)
        }
    }

    struct Broken;

    #[async_trait]
    impl Schema for Broken {
        async fn validate(&self, _: Value, _: &ValidateOptions) -> Result<Value, SchemaError> {
            Err(SchemaError::Other("rule crashed".into()))
        }

        fn cast(&self, data: Value, _: &CastOptions) -> Result<Value, SchemaError> {
            Ok(data)
        }
    }

    fn cell_field(form: &FormSession, name: &str, value: &str) -> FieldCell {
        let cell = FieldCell::new(value);
        form.register_field(FieldHandle::from_cell(name, cell.clone()))
            .unwrap();
        cell
    }

    #[tokio::test]
    async fn test_submit_without_schema_delivers_assembled_data() {
        let received = Arc::new(Mutex::new(None));
        let r = received.clone();
        let form = FormSession::new(FormSettings::default())
            .on_submit(move |data, _| *r.lock().unwrap() = Some(data));
        cell_field(&form, "name", "Alice");
        cell_field(&form, "address.city", "Rome");

        let outcome = form.submit().await.unwrap();
        let expected = Value::from(json!({"name": "Alice", "address": {"city": "Rome"}}));
        assert_eq!(outcome, SubmitOutcome::Submitted(expected.clone()));
        assert_eq!(*received.lock().unwrap(), Some(expected));
        assert_eq!(form.submit_state(), SubmitState::Idle);
        assert_eq!(form.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_rejection_publishes_errors_and_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let form = FormSession::new(FormSettings::default())
            .with_schema(RequiredFields(vec!["name", "email"]))
            .on_submit(move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
            });
        cell_field(&form, "name", "");
        cell_field(&form, "email", "");

        let outcome = form.submit().await.unwrap();
        let errors = outcome.errors().unwrap();
        assert!(errors.contains("name"));
        assert!(errors.contains("email"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(form.errors().len(), 2);
        assert_eq!(form.submit_state(), SubmitState::Idle);
    }

    #[tokio::test]
    async fn test_errors_are_replaced_not_merged() {
        let form = FormSession::new(FormSettings::default())
            .with_schema(RequiredFields(vec!["a", "b"]));
        let a = cell_field(&form, "a", "");
        let b = cell_field(&form, "b", "filled");

        form.submit().await.unwrap();
        assert_eq!(form.errors().iter().collect::<Vec<_>>(), vec![("a", "Required.")]);

        a.set(Value::from("filled"));
        b.set(Value::from(""));
        form.submit().await.unwrap();
        assert_eq!(form.errors().iter().collect::<Vec<_>>(), vec![("b", "Required.")]);
    }

    #[tokio::test]
    async fn test_success_clears_errors() {
        let form = FormSession::new(FormSettings::default())
            .with_schema(RequiredFields(vec!["a"]));
        let a = cell_field(&form, "a", "");
        assert!(!form.submit().await.unwrap().is_submitted());
        assert!(!form.errors().is_empty());
        a.set(Value::from("ok"));
        assert!(form.submit().await.unwrap().is_submitted());
        assert!(form.errors().is_empty());
    }

    #[tokio::test]
    async fn test_every_submit_publishes_new_generation() {
        let form = FormSession::new(FormSettings::default());
        let ctx = form.context();
        assert_eq!(ctx.generation(), 0);
        form.submit().await.unwrap();
        assert!(ctx.is_stale());
        assert_eq!(ctx.refreshed().generation(), 1);
        form.submit().await.unwrap();
        assert_eq!(form.subscribe_errors().borrow().generation, 2);
    }

    #[tokio::test]
    async fn test_unexpected_schema_error_propagates() {
        let form = FormSession::new(FormSettings::default()).with_schema(Broken);
        cell_field(&form, "a", "x");
        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, FormError::Schema(SchemaError::Other(_))));
        assert_eq!(form.submit_state(), SubmitState::Idle);
        assert_eq!(form.subscribe_errors().borrow().generation, 0);

        // the session is usable again afterwards
        assert!(matches!(form.submit().await, Err(FormError::Schema(_))));
    }

    #[tokio::test]
    async fn test_concurrent_submit_is_rejected() {
        let gate = Arc::new(Notify::new());
        let form = Arc::new(FormSession::new(FormSettings::default()).with_schema(Gate(gate.clone())));
        cell_field(&form, "a", "x");

        let first = {
            let form = Arc::clone(&form);
            tokio::spawn(async move { form.submit().await })
        };
        while form.submit_state() != SubmitState::Validating {
            tokio::task::yield_now().await;
        }
        assert!(matches!(form.submit().await, Err(FormError::SubmitInProgress)));

        gate.notify_one();
        assert!(first.await.unwrap().unwrap().is_submitted());
        assert_eq!(form.submit_state(), SubmitState::Idle);
        assert_eq!(form.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_submit_returns_to_idle() {
        let gate = Arc::new(Notify::new());
        let form = FormSession::new(FormSettings::default()).with_schema(Gate(gate));
        let pending = form.submit();
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(10), pending).await;
        assert!(timed_out.is_err());
        assert_eq!(form.submit_state(), SubmitState::Idle);
        assert!(!form.in_flight.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_handler_can_reset_form() {
        let form = FormSession::new(FormSettings::default())
            .on_submit(|_, helpers| {
                helpers.reset_form().unwrap();
            });
        let name = cell_field(&form, "name", "Alice");
        let outcome = form.submit().await.unwrap();
        assert_eq!(
            outcome.data().and_then(|d| d.get("name")),
            Some(&Value::from("Alice"))
        );
        assert_eq!(name.get(), Value::from(""));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let form = FormSession::new(FormSettings::default());
        let a = cell_field(&form, "a", "one");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        form.register_field(
            FieldHandle::from_getter("b", || Value::from("two"))
                .with_setter(move |v| s.lock().unwrap().push(v)),
        )
        .unwrap();
        form.register_field(FieldHandle::from_getter("c", || Value::from(3)))
            .unwrap();

        assert_eq!(form.reset_form().unwrap(), 2);
        assert_eq!(a.get(), Value::from(""));
        assert_eq!(form.reset_form().unwrap(), 2);
        assert_eq!(a.get(), Value::from(""));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Value::from(""), Value::from("")]
        );
    }

    #[test]
    fn test_reset_uses_configured_value() {
        let form = FormSession::new(FormSettings::default().with_reset_value(Value::Null));
        let a = cell_field(&form, "a", "one");
        form.reset_form().unwrap();
        assert_eq!(a.get(), Value::Null);
    }

    #[tokio::test]
    async fn test_reset_does_not_touch_errors() {
        let form = FormSession::new(FormSettings::default())
            .with_schema(RequiredFields(vec!["a"]));
        cell_field(&form, "a", "");
        form.submit().await.unwrap();
        form.reset_form().unwrap();
        assert!(form.errors().contains("a"));
    }

    #[tokio::test]
    async fn test_accumulator_mode_behaves_the_same() {
        let settings = FormSettings::default().with_registry_mode(RegistryMode::Accumulator);
        let form = FormSession::new(settings);
        cell_field(&form, "x.y", "1");
        form.unregister_field("missing").unwrap();
        let outcome = form.submit().await.unwrap();
        assert_eq!(outcome.data().unwrap().to_json(), json!({"x": {"y": "1"}}));
    }

    #[test]
    fn test_context_exposes_initial_data() {
        let form = FormSession::new(FormSettings::default())
            .with_initial_data(Value::from(json!({"name": "Bob"})));
        assert_eq!(form.context().initial_value("name"), Value::from("Bob"));
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        let a = FormSession::new(FormSettings::default());
        let b = FormSession::new(FormSettings::default());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_field_names() {
        let form = FormSession::new(FormSettings::default());
        cell_field(&form, "a", "");
        let ctx = form.context().scope("sub").unwrap();
        ctx.register_field(FieldHandle::from_cell("b", FieldCell::new(""))).unwrap();
        assert_eq!(form.field_names().unwrap(), vec!["a", "sub.b"]);
    }
}
