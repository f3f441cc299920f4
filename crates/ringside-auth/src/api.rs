//! Backend auth API: endpoints and wire types.

use std::fmt;

use serde::{Deserialize, Serialize};

use ringside_core::UserProfile;

pub const LOGIN_PATH: &str = "/auth/login";
pub const SIGNUP_PATH: &str = "/auth/signup";
pub const REFRESH_PATH: &str = "/auth/refresh-token";
pub const CHANGE_PASSWORD_PATH: &str = "/auth/change-password";

/// Login request body.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Signup request body.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

/// Change-password request body.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

/// Login/signup response: `{ token, user, message }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Refresh response: `{ success, token, user }`, or a failure that may carry
/// `requiresLogin`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub requires_login: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Successful login or signup.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserProfile,
    pub message: Option<String>,
}

/// User-facing message for a rejected login or signup.
///
/// The common client errors get fixed wording; anything else falls back to
/// the server's message.
pub fn login_failure_message(status: u16, server_message: Option<&str>) -> String {
    match status {
        400 => "Please check the details you entered.".to_string(),
        401 => "Invalid email or password.".to_string(),
        403 => "This account is not allowed to sign in.".to_string(),
        404 => "No account was found for that email.".to_string(),
        _ => server_message.map_or_else(
            || format!("Sign-in failed (status {status}). Please try again later."),
            str::to_string,
        ),
    }
}
