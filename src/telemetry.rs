//! Log output for the `dashboard` binary.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! `RUST_LOG` picks the verbosity; a missing or unparseable value falls back
//! to [`DEFAULT_LOG_FILTER`].

use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Build a filter from `RUST_LOG`-style directives. Blank means the default.
///
/// # Errors
///
/// Returns the default filter together with the parse error when the
/// directives are invalid.
pub fn filter_from(directives: &str) -> Result<EnvFilter, (EnvFilter, ParseError)> {
    let directives = directives.trim();
    if directives.is_empty() {
        return Ok(EnvFilter::new(DEFAULT_LOG_FILTER));
    }
    EnvFilter::try_new(directives).map_err(|e| (EnvFilter::new(DEFAULT_LOG_FILTER), e))
}

/// Install the global subscriber. Call once, before any other work.
pub fn init() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let (filter, invalid) = match filter_from(&directives) {
        Ok(filter) => (filter, None),
        Err((filter, e)) => (filter, Some(e)),
    };
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_env_filter(filter).init();
    if let Some(e) = invalid {
        warn!(error = %e, "invalid {}; logging at {DEFAULT_LOG_FILTER}", EnvFilter::DEFAULT_ENV);
    }
}

#[cfg(test)]
#[path = "telemetry_test.rs"]
mod tests;
