//! `Ringside` auth client.
//!
//! - [`AuthManager`]: token refresh with single-flight coalescing, logout,
//!   login/signup
//! - [`AuthedClient`]: bearer-authenticated API calls that refresh ahead of
//!   expiry and log out when the server demands it
//! - [`RouteGuard`]: hydration-aware access control for protected views
//! - [`Keepalive`]: periodic background refresh

pub mod api;
pub mod error;
pub mod guard;
pub mod keepalive;
pub mod manager;
pub mod navigator;
pub mod request;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

#[cfg(test)]
mod scenario_tests;

pub use error::AuthError;
pub use guard::{GuardState, GuardView, ManagerValidator, RouteGuard, TokenValidator, Validation};
pub use keepalive::Keepalive;
pub use manager::{AuthManager, Routes};
pub use navigator::{LogNavigator, Navigator};
pub use request::AuthedClient;
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
