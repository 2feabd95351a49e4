//! Client-side state shared by the router and the API client.
//!
//! SYSTEM CONTEXT
//! ==============
//! `session` is the single source of truth for "is the user logged in, and
//! with what role". The login flow writes it, logout and 401 handling clear
//! it, and route guards only read it.

pub mod session;
