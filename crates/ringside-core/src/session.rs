//! Session model: a bearer token together with the profile it was issued for.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Role carried by a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    /// Any role string this client does not know about.
    #[serde(other)]
    Other,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(Error::Config(format!("Unknown role: {other}"))),
        }
    }
}

/// User profile as returned by the backend auth API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl UserProfile {
    /// Name to show for this user, falling back to the local part of the email.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self
                .email
                .split('@')
                .next()
                .unwrap_or(&self.email)
                .to_string(),
        }
    }
}

/// An authenticated session.
///
/// Always holds a non-empty token and a profile; "logged out" is represented
/// by the absence of a `Session`, never by a half-filled one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    token: String,
    user: UserProfile,
}

impl Session {
    /// Build a session, rejecting an empty token.
    pub fn new(token: impl Into<String>, user: UserProfile) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::InvalidSession("token is empty".into()));
        }
        Ok(Self { token, user })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub const fn user(&self) -> &UserProfile {
        &self.user
    }

    pub const fn role(&self) -> Role {
        self.user.role
    }

    /// Check the invariant on a value that bypassed [`Session::new`] (e.g.
    /// deserialized from storage).
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(Error::InvalidSession("token is empty".into()));
        }
        if self.user.id.is_empty() {
            return Err(Error::InvalidSession("user id is empty".into()));
        }
        Ok(())
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}
