//! Settings for form sessions.
//!
//! [`FormSettings`] carries every tunable of a form session with sensible
//! defaults. Settings are plain values handed to each session, so several
//! independently configured forms can coexist in one process. See
//! [`settings_loader`](crate::settings_loader) for loading them from files
//! and the environment.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// How a form session stores its registered fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryMode {
    /// Every registration publishes a new immutable snapshot.
    #[default]
    Snapshot,
    /// Registrations mutate one accumulator in place.
    Accumulator,
}

impl std::str::FromStr for RegistryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "snapshot" => Ok(Self::Snapshot),
            "accumulator" => Ok(Self::Accumulator),
            other => Err(format!("unknown registry mode '{other}'")),
        }
    }
}

/// The complete set of form session settings.
///
/// # Examples
///
/// ```
/// use unform_rs_core::settings::{FormSettings, RegistryMode};
///
/// let settings = FormSettings::default();
/// assert_eq!(settings.registry_mode, RegistryMode::Snapshot);
/// assert!(settings.reject_overlapping_paths);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSettings {
    // ── Logging ──────────────────────────────────────────────────────

    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,
    /// The log filter (e.g. "info", "unform_rs_forms=debug").
    pub log_level: String,

    // ── Registry ─────────────────────────────────────────────────────

    /// Field storage strategy.
    pub registry_mode: RegistryMode,
    /// Reject a field whose name is a segment prefix of another live field.
    pub reject_overlapping_paths: bool,

    // ── Reset ────────────────────────────────────────────────────────

    /// The value written to every field by `reset_form`.
    pub reset_value: Value,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            registry_mode: RegistryMode::Snapshot,
            reject_overlapping_paths: true,
            reset_value: Value::String(String::new()),
        }
    }
}

impl FormSettings {
    /// Sets the registry mode.
    #[must_use]
    pub const fn with_registry_mode(mut self, mode: RegistryMode) -> Self {
        self.registry_mode = mode;
        self
    }

    /// Sets the reset value.
    #[must_use]
    pub fn with_reset_value(mut self, value: impl Into<Value>) -> Self {
        self.reset_value = value.into();
        self
    }

    /// Enables or disables overlap rejection.
    #[must_use]
    pub const fn with_reject_overlapping_paths(mut self, reject: bool) -> Self {
        self.reject_overlapping_paths = reject;
        self
    }
}
