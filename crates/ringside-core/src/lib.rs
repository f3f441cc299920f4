//! `Ringside` Core Library
//!
//! Shared functionality for `Ringside` clients:
//! - Session model (bearer token + user profile)
//! - Token inspection (expiry look-ahead)
//! - Persisted session store with explicit hydration
//! - Configuration resolution and common error types

pub mod config;
pub mod error;
pub mod session;
pub mod storage;
pub mod store;
pub mod token;
pub mod tracing_init;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use session::{Role, Session, UserProfile};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{SESSION_KEY, SessionStore, StoreSnapshot};
