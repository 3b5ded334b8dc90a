//! Dotted-path codec.
//!
//! A dotted path such as `address.city` names a location inside a nested
//! [`Value::Object`]. [`flatten`] folds a flat list of `(path, value)` entries
//! into one nested object; [`extract`] reads the slice of a value at a path.
//! Both functions borrow their inputs and never mutate them.

use crate::value::{Value, ValueMap};

/// The segment separator.
pub const SEPARATOR: char = '.';

/// Returns `true` if `path` is a non-empty, `.`-delimited sequence of
/// non-empty segments.
///
/// # Examples
///
/// ```
/// use unform_rs_core::utils::dotted::is_valid_path;
///
/// assert!(is_valid_path("address.city"));
/// assert!(!is_valid_path("address..city"));
/// assert!(!is_valid_path(""));
/// ```
pub fn is_valid_path(path: &str) -> bool {
    !path.is_empty() && path.split(SEPARATOR).all(|segment| !segment.is_empty())
}

/// Joins a scope prefix and a relative path. An empty prefix yields `path`.
pub fn join(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else if path.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}{SEPARATOR}{path}")
    }
}

/// Returns `true` when one path is a strict segment-wise prefix of the other,
/// e.g. `address` and `address.city`. Equal paths do not overlap.
pub fn overlaps(a: &str, b: &str) -> bool {
    fn is_prefix(short: &str, long: &str) -> bool {
        long.len() > short.len()
            && long.starts_with(short)
            && long[short.len()..].starts_with(SEPARATOR)
    }
    is_prefix(a, b) || is_prefix(b, a)
}

/// Builds a nested object from `(dotted path, value)` entries.
///
/// Intermediate objects are created as needed. When paths overlap, later
/// entries win: a deeper write through a non-object replaces it with an
/// object, and a shallower write replaces the whole subtree.
///
/// # Examples
///
/// ```
/// use unform_rs_core::utils::dotted::flatten;
/// use unform_rs_core::value::Value;
///
/// let data = flatten(vec![
///     ("name", Value::from("Alice")),
///     ("address.city", Value::from("Rome")),
/// ]);
/// assert_eq!(
///     data.to_json(),
///     serde_json::json!({"name": "Alice", "address": {"city": "Rome"}})
/// );
/// ```
pub fn flatten<I, S>(entries: I) -> Value
where
    I: IntoIterator<Item = (S, Value)>,
    S: AsRef<str>,
{
    let mut root = ValueMap::new();
    for (path, value) in entries {
        insert(&mut root, path.as_ref(), value);
    }
    Value::Object(root)
}

/// Writes `value` at `path` inside `target`, creating intermediate objects.
pub fn insert(target: &mut ValueMap, path: &str, value: Value) {
    let mut segments = path.split(SEPARATOR).peekable();
    let mut current = target;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(Value::object);
        if !matches!(slot, Value::Object(_)) {
            *slot = Value::object();
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }
}

/// Returns the slice of `value` at `path`, or [`Value::Undefined`] when any
/// segment is absent. An empty path returns the whole value.
///
/// Numeric segments index into lists.
///
/// # Examples
///
/// ```
/// use unform_rs_core::utils::dotted::extract;
/// use unform_rs_core::value::Value;
///
/// let v = Value::from(serde_json::json!({"checked": true, "extra": {"note": "hi"}}));
/// assert_eq!(extract("extra.note", &v), Value::from("hi"));
/// assert_eq!(extract("extra.missing", &v), Value::Undefined);
/// ```
pub fn extract(path: &str, value: &Value) -> Value {
    lookup(path, value).cloned().unwrap_or(Value::Undefined)
}

/// Borrowing variant of [`extract`].
pub fn lookup<'a>(path: &str, value: &'a Value) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split(SEPARATOR)
        .try_fold(value, |current, segment| current.get(segment))
}
