//! Field registries: the live set of mounted fields of one form.
//!
//! Two storage strategies implement [`FieldRegistry`]:
//!
//! - [`SnapshotRegistry`] treats the field list as immutable state. Every
//!   registration builds and publishes a new snapshot, so taking a snapshot
//!   for submission is a reference-count bump.
//! - [`AccumulatorRegistry`] keeps one vector and mutates it in place, which
//!   is cheaper under heavy mount/unmount churn. Snapshots copy the handles.
//!
//! Both enforce the same invariants: names are valid dotted paths, a name is
//! live at most once (re-registration supersedes in place) and, unless
//! disabled, no live name is a segment prefix of another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use unform_rs_core::error::{FormError, FormResult};
use unform_rs_core::settings::{FormSettings, RegistryMode};
use unform_rs_core::utils::dotted;

use crate::field::FieldHandle;

/// An immutable view of the registered fields at one point in time.
#[derive(Clone, Debug)]
pub struct RegistrySnapshot {
    fields: Arc<[FieldHandle]>,
    revision: u64,
}

impl Default for RegistrySnapshot {
    fn default() -> Self {
        Self::new(Vec::new(), 0)
    }
}

impl RegistrySnapshot {
    fn new(fields: Vec<FieldHandle>, revision: u64) -> Self {
        Self {
            fields: fields.into(),
            revision,
        }
    }

    /// Iterates the handles in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldHandle> {
        self.fields.iter()
    }

    /// The number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no field is registered.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The registry revision this snapshot was taken at.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// The registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|h| h.name().to_string()).collect()
    }

    /// Looks up a handle by name.
    pub fn get(&self, name: &str) -> Option<&FieldHandle> {
        self.fields.iter().find(|h| h.name() == name)
    }
}

impl<'a> IntoIterator for &'a RegistrySnapshot {
    type Item = &'a FieldHandle;
    type IntoIter = std::slice::Iter<'a, FieldHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// The registration API shared by both storage strategies.
pub trait FieldRegistry: Send + Sync {
    /// Adds `handle`, superseding a live handle with the same name.
    fn register(&self, handle: FieldHandle) -> FormResult<()>;

    /// Removes the handle named `name`. Returns `false` (not an error) when
    /// no such handle is live.
    fn unregister(&self, name: &str) -> FormResult<bool>;

    /// The authoritative field set at this moment.
    fn snapshot(&self) -> FormResult<RegistrySnapshot>;

    /// A counter bumped on every change.
    fn revision(&self) -> u64;

    /// The storage strategy.
    fn mode(&self) -> RegistryMode;
}

/// Creates the registry selected by `settings.registry_mode`.
pub fn create_registry(settings: &FormSettings) -> Arc<dyn FieldRegistry> {
    match settings.registry_mode {
        RegistryMode::Snapshot => Arc::new(SnapshotRegistry::new(settings.reject_overlapping_paths)),
        RegistryMode::Accumulator => {
            Arc::new(AccumulatorRegistry::new(settings.reject_overlapping_paths))
        }
    }
}

/// Checks `handle` against the live set. Returns the index of the handle it
/// supersedes, if any.
fn admit(
    live: &[FieldHandle],
    handle: &FieldHandle,
    reject_overlapping: bool,
) -> FormResult<Option<usize>> {
    let name = handle.name();
    if !dotted::is_valid_path(name) {
        return Err(FormError::InvalidPath(name.to_string()));
    }
    if let Some(path) = handle.sub_path() {
        if !path.is_empty() && !dotted::is_valid_path(path) {
            return Err(FormError::InvalidPath(path.to_string()));
        }
    }
    if reject_overlapping {
        if let Some(existing) = live.iter().find(|h| dotted::overlaps(h.name(), name)) {
            return Err(FormError::OverlappingPath {
                path: name.to_string(),
                existing: existing.name().to_string(),
            });
        }
    }
    Ok(live.iter().position(|h| h.name() == name))
}

// ── Snapshot strategy ────────────────────────────────────────────────

/// A registry publishing a fresh immutable snapshot on every change.
#[derive(Debug)]
pub struct SnapshotRegistry {
    state: RwLock<RegistrySnapshot>,
    reject_overlapping: bool,
}

impl SnapshotRegistry {
    /// Creates an empty registry.
    pub fn new(reject_overlapping: bool) -> Self {
        Self {
            state: RwLock::new(RegistrySnapshot::default()),
            reject_overlapping,
        }
    }
}

impl Default for SnapshotRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FieldRegistry for SnapshotRegistry {
    fn register(&self, handle: FieldHandle) -> FormResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| FormError::StatePoisoned("registering field"))?;
        let superseded = admit(&state.fields, &handle, self.reject_overlapping)?;
        let mut next: Vec<FieldHandle> = state.fields.to_vec();
        tracing::debug!(field = handle.name(), superseded = superseded.is_some(), "register field");
        match superseded {
            Some(index) => next[index] = handle,
            None => next.push(handle),
        }
        *state = RegistrySnapshot::new(next, state.revision + 1);
        Ok(())
    }

    fn unregister(&self, name: &str) -> FormResult<bool> {
        let mut state = self
            .state
            .write()
            .map_err(|_| FormError::StatePoisoned("unregistering field"))?;
        if state.get(name).is_none() {
            return Ok(false);
        }
        let next: Vec<FieldHandle> = state
            .fields
            .iter()
            .filter(|h| h.name() != name)
            .cloned()
            .collect();
        tracing::debug!(field = name, "unregister field");
        *state = RegistrySnapshot::new(next, state.revision + 1);
        Ok(true)
    }

    fn snapshot(&self) -> FormResult<RegistrySnapshot> {
        self.state
            .read()
            .map(|state| state.clone())
            .map_err(|_| FormError::StatePoisoned("reading registry"))
    }

    fn revision(&self) -> u64 {
        self.state.read().map_or(0, |state| state.revision)
    }

    fn mode(&self) -> RegistryMode {
        RegistryMode::Snapshot
    }
}

// ── Accumulator strategy ─────────────────────────────────────────────

/// A registry mutating a single vector in place.
#[derive(Debug)]
pub struct AccumulatorRegistry {
    fields: RwLock<Vec<FieldHandle>>,
    revision: AtomicU64,
    reject_overlapping: bool,
}

impl AccumulatorRegistry {
    /// Creates an empty registry.
    pub fn new(reject_overlapping: bool) -> Self {
        Self {
            fields: RwLock::new(Vec::new()),
            revision: AtomicU64::new(0),
            reject_overlapping,
        }
    }
}

impl Default for AccumulatorRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FieldRegistry for AccumulatorRegistry {
    fn register(&self, handle: FieldHandle) -> FormResult<()> {
        let mut fields = self
            .fields
            .write()
            .map_err(|_| FormError::StatePoisoned("registering field"))?;
        let superseded = admit(&fields, &handle, self.reject_overlapping)?;
        tracing::debug!(field = handle.name(), superseded = superseded.is_some(), "register field");
        match superseded {
            Some(index) => fields[index] = handle,
            None => fields.push(handle),
        }
        self.revision.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unregister(&self, name: &str) -> FormResult<bool> {
        let mut fields = self
            .fields
            .write()
            .map_err(|_| FormError::StatePoisoned("unregistering field"))?;
        let before = fields.len();
        fields.retain(|h| h.name() != name);
        let removed = fields.len() < before;
        if removed {
            tracing::debug!(field = name, "unregister field");
            self.revision.fetch_add(1, Ordering::SeqCst);
        }
        Ok(removed)
    }

    fn snapshot(&self) -> FormResult<RegistrySnapshot> {
        let fields = self
            .fields
            .read()
            .map_err(|_| FormError::StatePoisoned("reading registry"))?;
        Ok(RegistrySnapshot::new(
            fields.clone(),
            self.revision.load(Ordering::SeqCst),
        ))
    }

    fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    fn mode(&self) -> RegistryMode {
        RegistryMode::Accumulator
    }
}
