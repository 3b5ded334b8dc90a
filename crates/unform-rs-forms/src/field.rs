//! Field handles: the registry's record of one mounted input.
//!
//! A [`FieldHandle`] pairs a dotted name with a way to read the field's
//! current value ([`ValueSource`]), an optional way to clear it
//! ([`ResetTarget`]) and an optional sub-path selecting the slice of the raw
//! value that is contributed to the form data.
//!
//! Value sources are a tagged union rather than a duck-typed "ref": a field
//! either owns a shared [`FieldCell`] or exposes a getter closure.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use unform_rs_core::utils::dotted;
use unform_rs_core::value::Value;

/// A zero-argument function producing a field's current value.
pub type Getter = Arc<dyn Fn() -> Value + Send + Sync>;

/// A one-argument function writing a new value into a field.
pub type Setter = Arc<dyn Fn(Value) + Send + Sync>;

/// A shared, mutable value container owned by a field widget.
///
/// Cloning a `FieldCell` yields another handle to the same value.
///
/// # Examples
///
/// ```
/// use unform_rs_forms::field::FieldCell;
/// use unform_rs_core::value::Value;
///
/// let cell = FieldCell::new("Alice");
/// let widget_side = cell.clone();
/// widget_side.set(Value::from("Bob"));
/// assert_eq!(cell.get(), Value::from("Bob"));
/// ```
#[derive(Clone, Default)]
pub struct FieldCell(Arc<RwLock<Value>>);

impl FieldCell {
    /// Creates a cell holding `value`.
    pub fn new(value: impl Into<Value>) -> Self {
        Self(Arc::new(RwLock::new(value.into())))
    }

    /// Returns a copy of the current value.
    pub fn get(&self) -> Value {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the current value.
    pub fn set(&self, value: Value) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Returns `true` if both cells share the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FieldCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldCell").field(&self.get()).finish()
    }
}

/// Where a field's value is read from.
#[derive(Clone)]
pub enum ValueSource {
    /// A shared container read directly.
    Cell(FieldCell),
    /// A function invoked on demand (composite widgets and the like).
    Getter(Getter),
}

impl ValueSource {
    /// Reads the current value.
    pub fn read(&self) -> Value {
        match self {
            Self::Cell(cell) => cell.get(),
            Self::Getter(getter) => getter(),
        }
    }
}

impl fmt::Debug for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(cell) => f.debug_tuple("Cell").field(cell).finish(),
            Self::Getter(_) => f.write_str("Getter(..)"),
        }
    }
}

/// How a field is cleared by a form reset.
#[derive(Clone)]
pub enum ResetTarget {
    /// Assign the empty value to this container.
    Cell(FieldCell),
    /// Invoke this setter with the empty value.
    Setter(Setter),
}

impl ResetTarget {
    /// Writes `empty` through this target.
    pub fn apply(&self, empty: &Value) {
        match self {
            Self::Cell(cell) => cell.set(empty.clone()),
            Self::Setter(setter) => setter(empty.clone()),
        }
    }
}

impl fmt::Debug for ResetTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(cell) => f.debug_tuple("Cell").field(cell).finish(),
            Self::Setter(_) => f.write_str("Setter(..)"),
        }
    }
}

/// The registry's record of one mounted field.
///
/// # Examples
///
/// ```
/// use unform_rs_forms::field::{FieldCell, FieldHandle};
/// use unform_rs_core::value::Value;
///
/// let cell = FieldCell::new("Rome");
/// let handle = FieldHandle::from_cell("address.city", cell);
/// assert_eq!(handle.name(), "address.city");
/// assert_eq!(handle.resolve(), Value::from("Rome"));
/// ```
#[derive(Clone, Debug)]
pub struct FieldHandle {
    name: String,
    source: ValueSource,
    reset: Option<ResetTarget>,
    sub_path: Option<String>,
}

impl FieldHandle {
    /// Creates a handle reading from (and reset through) `cell`.
    pub fn from_cell(name: impl Into<String>, cell: FieldCell) -> Self {
        Self {
            name: name.into(),
            source: ValueSource::Cell(cell.clone()),
            reset: Some(ResetTarget::Cell(cell)),
            sub_path: None,
        }
    }

    /// Creates a handle whose value is computed by `getter`. It has no reset
    /// target until [`with_setter`](Self::with_setter) is called.
    pub fn from_getter<F>(name: impl Into<String>, getter: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            source: ValueSource::Getter(Arc::new(getter)),
            reset: None,
            sub_path: None,
        }
    }

    /// Resets this field by calling `setter` with the empty value.
    #[must_use]
    pub fn with_setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.reset = Some(ResetTarget::Setter(Arc::new(setter)));
        self
    }

    /// Resets this field by clearing `cell`.
    #[must_use]
    pub fn with_reset_cell(mut self, cell: FieldCell) -> Self {
        self.reset = Some(ResetTarget::Cell(cell));
        self
    }

    /// Removes the reset target; resets leave this field untouched.
    #[must_use]
    pub fn without_reset(mut self) -> Self {
        self.reset = None;
        self
    }

    /// Contributes only the slice of the raw value at `sub_path`.
    #[must_use]
    pub fn with_sub_path(mut self, sub_path: impl Into<String>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }

    /// The dotted field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value source.
    pub const fn source(&self) -> &ValueSource {
        &self.source
    }

    /// The reset target, if any.
    pub const fn reset_target(&self) -> Option<&ResetTarget> {
        self.reset.as_ref()
    }

    /// The sub-path override, if any.
    pub fn sub_path(&self) -> Option<&str> {
        self.sub_path.as_deref()
    }

    /// Reads the current value and applies the sub-path.
    pub fn resolve(&self) -> Value {
        let raw = self.source.read();
        match &self.sub_path {
            Some(path) => dotted::extract(path, &raw),
            None => raw,
        }
    }

    /// Clears the field through its reset target. Returns `false` if the
    /// field has none.
    pub fn reset(&self, empty: &Value) -> bool {
        self.reset.as_ref().is_some_and(|target| {
            target.apply(empty);
            true
        })
    }

    /// Returns this handle renamed under `scope`.
    #[must_use]
    pub(crate) fn scoped(mut self, scope: &str) -> Self {
        self.name = dotted::join(scope, &self.name);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_handle_reads_and_resets() {
        let cell = FieldCell::new("Alice");
        let handle = FieldHandle::from_cell("name", cell.clone());
        assert_eq!(handle.resolve(), Value::from("Alice"));
        assert!(handle.reset(&Value::from("")));
        assert_eq!(cell.get(), Value::from(""));
    }

    #[test]
    fn test_getter_handle_is_called_on_demand() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let handle = FieldHandle::from_getter("rating", move || {
            Value::from(i64::try_from(c.fetch_add(1, Ordering::SeqCst)).unwrap_or(0))
        });
        assert_eq!(handle.resolve(), Value::Int(0));
        assert_eq!(handle.resolve(), Value::Int(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_getter_without_setter_has_no_reset() {
        let handle = FieldHandle::from_getter("x", || Value::from(1));
        assert!(handle.reset_target().is_none());
        assert!(!handle.reset(&Value::Null));
    }

    #[test]
    fn test_setter_receives_empty_value() {
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        let handle = FieldHandle::from_getter("picker", || Value::from("chosen"))
            .with_setter(move |v| *s.lock().unwrap() = Some(v));
        handle.reset(&Value::from(""));
        assert_eq!(*seen.lock().unwrap(), Some(Value::from("")));
    }

    #[test]
    fn test_sub_path_selects_slice() {
        let cell = FieldCell::new(Value::from(json!({"checked": true, "extra": {"note": "n"}})));
        let handle = FieldHandle::from_cell("consent", cell).with_sub_path("extra");
        assert_eq!(handle.resolve().to_json(), json!({"note": "n"}));
    }

    #[test]
    fn test_sub_path_missing_is_undefined() {
        let cell = FieldCell::new("plain");
        let handle = FieldHandle::from_cell("f", cell).with_sub_path("deep.key");
        assert_eq!(handle.resolve(), Value::Undefined);
    }

    #[test]
    fn test_separate_reset_cell() {
        let shown = FieldCell::new("visible");
        let hidden = FieldCell::new("hidden");
        let handle = FieldHandle::from_cell("f", shown.clone()).with_reset_cell(hidden.clone());
        handle.reset(&Value::Null);
        assert_eq!(shown.get(), Value::from("visible"));
        assert_eq!(hidden.get(), Value::Null);
    }

    #[test]
    fn test_without_reset() {
        let cell = FieldCell::new("keep");
        let handle = FieldHandle::from_cell("f", cell.clone()).without_reset();
        assert!(!handle.reset(&Value::Null));
        assert_eq!(cell.get(), Value::from("keep"));
    }

    #[test]
    fn test_scoped_prefixes_name() {
        let handle = FieldHandle::from_getter("city", || Value::Null).scoped("address");
        assert_eq!(handle.name(), "address.city");
        let handle = FieldHandle::from_getter("city", || Value::Null).scoped("");
        assert_eq!(handle.name(), "city");
    }

    #[test]
    fn test_cell_ptr_eq() {
        let a = FieldCell::new(1);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&FieldCell::new(1)));
    }
}
