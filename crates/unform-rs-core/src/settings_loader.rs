//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `UNFORM_DEBUG` | `debug` |
//! | `UNFORM_LOG_LEVEL` | `log_level` |
//! | `UNFORM_REGISTRY_MODE` | `registry_mode` (`snapshot` / `accumulator`) |
//! | `UNFORM_RESET_VALUE` | `reset_value` (as a string) |
//! | `UNFORM_REJECT_OVERLAPPING_PATHS` | `reject_overlapping_paths` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use unform_rs_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/forms.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::FormError;
use crate::settings::FormSettings;

/// Loads settings from a TOML string. Keys not present keep their defaults.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<FormSettings, FormError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| FormError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<FormSettings, FormError> {
    from_toml_str(&read(path.as_ref(), "TOML")?)
}

/// Loads settings from a TOML file and then applies environment overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<FormSettings, FormError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string. Keys not present keep their defaults.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<FormSettings, FormError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| FormError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<FormSettings, FormError> {
    from_json_str(&read(path.as_ref(), "JSON")?)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> FormSettings {
    let mut settings = FormSettings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `UNFORM_*` environment variable overrides.
pub fn apply_env_overrides(settings: &mut FormSettings) {
    apply_overrides_with(settings, |key| std::env::var(key).ok());
}

/// Applies overrides read through `lookup`, which maps a variable name to its
/// value. Unparseable values are ignored with a warning.
pub fn apply_overrides_with<F>(settings: &mut FormSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("UNFORM_DEBUG") {
        settings.debug = parse_flag(&val);
    }

    if let Some(val) = lookup("UNFORM_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("UNFORM_REGISTRY_MODE") {
        match val.parse() {
            Ok(mode) => settings.registry_mode = mode,
            Err(e) => tracing::warn!("Ignoring UNFORM_REGISTRY_MODE: {e}"),
        }
    }

    if let Some(val) = lookup("UNFORM_RESET_VALUE") {
        settings.reset_value = val.into();
    }

    if let Some(val) = lookup("UNFORM_REJECT_OVERLAPPING_PATHS") {
        settings.reject_overlapping_paths = parse_flag(&val);
    }
}

// ============================================================
// Helpers
// ============================================================

fn parse_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn read(path: &Path, format: &str) -> Result<String, FormError> {
    std::fs::read_to_string(path).map_err(|e| {
        FormError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_over_defaults(value: serde_json::Value, format: &str) -> Result<FormSettings, FormError> {
    let default_json = serde_json::to_value(FormSettings::default()).map_err(|e| {
        FormError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;
    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        FormError::ConfigurationError(format!("Failed to deserialize settings from {format}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
