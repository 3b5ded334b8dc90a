//! The scoped context handed down to field widgets.
//!
//! A [`ScopedContext`] is an explicit value bundle, never a global: the
//! rendering layer obtains one from its
//! [`FormSession`](crate::session::FormSession) and threads it to each field
//! it builds. It carries the initial data, the error map published by the
//! last submit, the scope path and the registration API.
//!
//! Error state is carried immutably. When the session publishes a new error
//! map, existing contexts keep the old one; [`ScopedContext::is_stale`]
//! reports this and [`ScopedContext::refreshed`] produces the new identity.
//!
//! Nested sub-forms use [`ScopedContext::scope`]: names registered or looked
//! up through a scoped context are prefixed with its scope path.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use unform_rs_core::error::{FormError, FormResult};
use unform_rs_core::utils::dotted;
use unform_rs_core::value::Value;

use crate::error_map::{ErrorMap, ErrorState};
use crate::field::FieldHandle;
use crate::registry::FieldRegistry;

/// The ambient form state visible to a field.
#[derive(Clone)]
pub struct ScopedContext {
    scope_path: String,
    initial_data: Arc<Value>,
    errors: ErrorState,
    registry: Arc<dyn FieldRegistry>,
    updates: watch::Receiver<ErrorState>,
}

impl fmt::Debug for ScopedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedContext")
            .field("scope_path", &self.scope_path)
            .field("generation", &self.errors.generation)
            .field("errors", &self.errors.errors)
            .finish_non_exhaustive()
    }
}

impl ScopedContext {
    pub(crate) fn root(
        initial_data: Arc<Value>,
        registry: Arc<dyn FieldRegistry>,
        mut updates: watch::Receiver<ErrorState>,
    ) -> Self {
        let errors = updates.borrow_and_update().clone();
        Self {
            scope_path: String::new(),
            initial_data,
            errors,
            registry,
            updates,
        }
    }

    /// The dotted prefix applied to names in this scope. Empty at the top
    /// level.
    pub fn scope_path(&self) -> &str {
        &self.scope_path
    }

    /// The form's whole initial data object.
    pub fn initial_data(&self) -> &Value {
        &self.initial_data
    }

    /// The initial value for `name` in this scope, or `Undefined`.
    pub fn initial_value(&self, name: &str) -> Value {
        dotted::extract(&self.qualify(name), &self.initial_data)
    }

    /// The whole error map this context was created with.
    pub fn errors(&self) -> &ErrorMap {
        &self.errors.errors
    }

    /// The error message for `name` in this scope.
    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.errors.get(&self.qualify(name))
    }

    /// The publication generation of the carried error map.
    pub const fn generation(&self) -> u64 {
        self.errors.generation
    }

    /// Returns `true` once the session has published a newer error map.
    pub fn is_stale(&self) -> bool {
        self.updates.borrow().generation != self.errors.generation
    }

    /// Returns a context carrying the latest published error map.
    #[must_use]
    pub fn refreshed(&self) -> Self {
        let mut next = self.clone();
        next.errors = next.updates.borrow_and_update().clone();
        next
    }

    /// Waits for the next error publication and adopts it. Returns `false`
    /// if the session was dropped.
    pub async fn changed(&mut self) -> bool {
        if self.updates.changed().await.is_err() {
            return false;
        }
        self.errors = self.updates.borrow_and_update().clone();
        true
    }

    /// Registers a field under this scope.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidPath`] or [`FormError::OverlappingPath`]
    /// when the qualified name is not admissible.
    pub fn register_field(&self, handle: FieldHandle) -> FormResult<()> {
        Self::check_relative(handle.name())?;
        self.registry.register(handle.scoped(&self.scope_path))
    }

    /// Unregisters the field `name` of this scope. Unknown names are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidPath`] if `name` is not a dotted path.
    pub fn unregister_field(&self, name: &str) -> FormResult<bool> {
        Self::check_relative(name)?;
        self.registry.unregister(&self.qualify(name))
    }

    /// Returns a child context for the sub-form at `segment`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidPath`] if `segment` is not a dotted path.
    pub fn scope(&self, segment: &str) -> FormResult<Self> {
        if !dotted::is_valid_path(segment) {
            return Err(FormError::InvalidPath(segment.to_string()));
        }
        let mut child = self.clone();
        child.scope_path = self.qualify(segment);
        Ok(child)
    }

    fn check_relative(name: &str) -> FormResult<()> {
        if dotted::is_valid_path(name) {
            Ok(())
        } else {
            Err(FormError::InvalidPath(name.to_string()))
        }
    }

    fn qualify(&self, name: &str) -> String {
        dotted::join(&self.scope_path, name)
    }
}
