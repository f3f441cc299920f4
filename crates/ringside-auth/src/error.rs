//! Auth client error types.

/// Errors surfaced by the auth manager, request wrapper and guard.
///
/// Cloneable so one refresh outcome can be handed to every coalesced waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The operation needs a session and there is none. Never triggers a
    /// logout on its own.
    #[error("No session token available")]
    NoToken,

    /// The refresh call failed or the server rejected it.
    #[error("Token refresh failed: {reason}")]
    RefreshFailed {
        reason: String,
        /// HTTP status, `None` when the request never got a response.
        status: Option<u16>,
        /// The server demanded a fresh login.
        requires_login: bool,
    },

    /// Raised by the request wrapper after a failed refresh; logout has
    /// already been triggered.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Raised by the request wrapper when the server demands re-login;
    /// logout has already been triggered.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// A refresh completed for a session that was replaced or cleared while
    /// it was in flight; its result was discarded.
    #[error("Session changed while the refresh was in flight")]
    SessionSuperseded,

    /// Login or signup rejected by the backend. `message` is user-facing.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Non-success response a caller opted to treat as an error.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid session: {0}")]
    Session(String),
}

impl AuthError {
    /// Failures caused by infrastructure (network, 5xx) rather than by the
    /// credentials themselves. The guard keeps the session for these.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::SessionSuperseded => true,
            Self::RefreshFailed {
                status,
                requires_login,
                ..
            } => {
                !*requires_login
                    && match status {
                        None => true,
                        Some(code) => *code >= 500,
                    }
            }
            _ => false,
        }
    }
}

impl From<ringside_core::Error> for AuthError {
    fn from(e: ringside_core::Error) -> Self {
        Self::Session(e.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn network_and_server_errors_are_transient() {
        assert!(AuthError::Transport("connection refused".into()).is_transient());
        assert!(
            AuthError::RefreshFailed {
                reason: "timeout".into(),
                status: None,
                requires_login: false,
            }
            .is_transient()
        );
        assert!(
            AuthError::RefreshFailed {
                reason: "bad gateway".into(),
                status: Some(502),
                requires_login: false,
            }
            .is_transient()
        );
    }

    #[test]
    fn credential_errors_are_not_transient() {
        assert!(!AuthError::NoToken.is_transient());
        assert!(
            !AuthError::RefreshFailed {
                reason: "expired".into(),
                status: Some(401),
                requires_login: false,
            }
            .is_transient()
        );
        assert!(
            !AuthError::RefreshFailed {
                reason: "login again".into(),
                status: Some(503),
                requires_login: true,
            }
            .is_transient()
        );
    }

    #[test]
    fn rejected_displays_user_message_only() {
        let err = AuthError::Rejected {
            status: 401,
            message: "Invalid email or password.".into(),
        };
        assert_eq!(err.to_string(), "Invalid email or password.");
    }
}
