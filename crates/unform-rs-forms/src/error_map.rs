//! The path-keyed error map published to fields after a submit.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use unform_rs_core::error::AggregateValidationError;
use unform_rs_core::utils::dotted;

/// Maps a dotted field path to its validation message.
///
/// Fields not present in the map are valid. An `ErrorMap` is never patched:
/// every submit attempt builds a new one and publishes it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<String, String>);

impl ErrorMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from an aggregate validation error. When several failures
    /// share a path, the last one wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use unform_rs_core::error::{AggregateValidationError, FieldFailure};
    /// use unform_rs_forms::error_map::ErrorMap;
    ///
    /// let agg = AggregateValidationError::new(vec![
    ///     FieldFailure::new("email", "Required.", "required"),
    ///     FieldFailure::new("email", "Enter a valid email address.", "email"),
    /// ]);
    /// let map = ErrorMap::from_aggregate(&agg);
    /// assert_eq!(map.get("email"), Some("Enter a valid email address."));
    /// ```
    pub fn from_aggregate(aggregate: &AggregateValidationError) -> Self {
        aggregate
            .inner
            .iter()
            .map(|failure| (failure.path.clone(), failure.message.clone()))
            .collect()
    }

    /// The message for `path`, if it failed.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    /// Returns `true` if `path` failed.
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    /// Number of failed paths.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when every field is valid.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(path, message)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The failed paths under `scope`, relative to it.
    pub fn within(&self, scope: &str) -> Self {
        if scope.is_empty() {
            return self.clone();
        }
        self.0
            .iter()
            .filter_map(|(path, message)| {
                path.strip_prefix(scope)
                    .and_then(|rest| rest.strip_prefix(dotted::SEPARATOR))
                    .map(|rest| (rest.to_string(), message.clone()))
            })
            .collect()
    }

    /// The underlying map.
    pub const fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl FromIterator<(String, String)> for ErrorMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ErrorMap {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One published version of a form's error map.
///
/// The generation increases on every publication, so observers can tell a
/// fresh (possibly equal) map from the one they already rendered.
#[derive(Debug, Clone, Default)]
pub struct ErrorState {
    /// Publication counter.
    pub generation: u64,
    /// The published map.
    pub errors: Arc<ErrorMap>,
}
