use tracing_subscriber::filter::LevelFilter;

use super::*;

fn max_level(filter: Result<EnvFilter, (EnvFilter, ParseError)>) -> Option<LevelFilter> {
    match filter {
        Ok(filter) | Err((filter, _)) => filter.max_level_hint(),
    }
}

#[test]
fn blank_directives_use_default_level() {
    assert!(filter_from("").is_ok());
    assert_eq!(max_level(filter_from("   ")), Some(LevelFilter::INFO));
}

#[test]
fn rust_log_directives_raise_verbosity() {
    assert_eq!(max_level(filter_from("debug")), Some(LevelFilter::DEBUG));
    assert_eq!(max_level(filter_from("warn,dashboard_client=trace")), Some(LevelFilter::TRACE));
}

#[test]
fn invalid_directives_fall_back_to_default() {
    let result = filter_from("dashboard_client=loud");
    assert!(result.is_err());
    assert_eq!(max_level(result), Some(LevelFilter::INFO));
}
