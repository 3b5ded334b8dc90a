//! Logging integration for the form engine.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`FormSettings`](crate::settings::FormSettings) and for creating
//! per-submit spans.

use crate::settings::FormSettings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter is read from `settings.log_level`. In debug mode a pretty,
/// human-readable format is used; otherwise a structured JSON format is used.
/// Installing a subscriber twice is silently ignored.
pub fn setup_logging(settings: &FormSettings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for one submit attempt.
///
/// # Examples
///
/// ```
/// use unform_rs_core::logging::submit_span;
///
/// let span = submit_span(7, 3);
/// let _guard = span.enter();
/// tracing::info!("validating");
/// ```
pub fn submit_span(form_id: u64, attempt: u64) -> tracing::Span {
    tracing::info_span!("submit", form = form_id, attempt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_twice_is_harmless() {
        let settings = FormSettings::default();
        setup_logging(&settings);
        setup_logging(&settings);
    }

    #[test]
    fn test_submit_span_enters() {
        let span = submit_span(1, 1);
        let _guard = span.enter();
        tracing::debug!("inside span");
    }
}
