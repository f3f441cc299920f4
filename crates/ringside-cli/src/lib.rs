//! Ringside CLI Library
//!
//! Command-line client for the Ringside API: account commands, authenticated
//! requests against the saved session, and a session monitor.

pub mod api_cmd;
pub mod auth_cmd;
pub mod context;
