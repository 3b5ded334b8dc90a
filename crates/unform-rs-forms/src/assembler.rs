//! Data assembly: turning a registry snapshot into one nested object.
//!
//! Every field in the snapshot is resolved (getter called or cell read, then
//! its sub-path applied) and the resulting `(name, value)` pairs are folded
//! by the dotted-path codec. Fields resolving to [`Value::Undefined`] keep
//! their key.

use unform_rs_core::utils::dotted;
use unform_rs_core::value::Value;

use crate::registry::RegistrySnapshot;

/// Resolves every field of `snapshot` into `(name, value)` pairs.
pub fn collect_entries(snapshot: &RegistrySnapshot) -> Vec<(String, Value)> {
    snapshot
        .iter()
        .map(|handle| (handle.name().to_string(), handle.resolve()))
        .collect()
}

/// Builds the nested data object for `snapshot`.
///
/// # Examples
///
/// ```
/// use unform_rs_forms::assembler::assemble;
/// use unform_rs_forms::field::{FieldCell, FieldHandle};
/// use unform_rs_forms::registry::{FieldRegistry, SnapshotRegistry};
///
/// let registry = SnapshotRegistry::new(true);
/// registry.register(FieldHandle::from_cell("address.city", FieldCell::new("Rome"))).unwrap();
/// let data = assemble(&registry.snapshot().unwrap());
/// assert_eq!(data.to_json(), serde_json::json!({"address": {"city": "Rome"}}));
/// ```
pub fn assemble(snapshot: &RegistrySnapshot) -> Value {
    let entries = collect_entries(snapshot);
    tracing::trace!(fields = entries.len(), "assembling form data");
    dotted::flatten(entries)
}
