//! Networking modules for the dashboard REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` owns the HTTP pipeline (bearer decoration, 401 handling, endpoint
//! wrappers) and `types` defines the auth envelopes and error taxonomy.

pub mod api;
pub mod types;
