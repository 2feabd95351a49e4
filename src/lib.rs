//! Client-side layer of the county poverty-monitoring dashboard.
//!
//! SYSTEM CONTEXT
//! ==============
//! `state` owns the persisted login session, `router` decides on every
//! navigation whether the current session may reach a page, and `net` wraps
//! the dashboard REST API with bearer-token decoration and 401 handling.
//! The `dashboard` binary drives all three from the command line and
//! installs log output through `telemetry`.

pub mod config;
pub mod net;
pub mod router;
pub mod state;
pub mod telemetry;
