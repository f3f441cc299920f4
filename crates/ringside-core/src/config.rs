//! Configuration resolution for Ringside clients.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/ringside/settings.json)
//! 3. Environment variables (`RINGSIDE_*`)
//! 4. CLI arguments (highest priority, applied by the binary)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::token::EXPIRY_WINDOW_SECS;

/// Client-side auth configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the backend REST API (e.g. `https://api.ringside.test`).
    pub api_url: String,
    /// Where logged-out users are sent.
    pub login_route: String,
    /// Where users without the required role are sent.
    pub home_route: String,
    /// Tokens expiring within this many seconds are refreshed proactively.
    pub refresh_window_secs: i64,
    /// Keepalive period. Defaults to half the refresh window so a token can
    /// never lapse between two ticks.
    pub keepalive_interval_secs: Option<u64>,
    /// Per-request timeout for backend calls.
    pub request_timeout_secs: u64,
    /// Directory for the persisted session. Defaults to `~/.ringside/`.
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080".to_string(),
            login_route: "/login".to_string(),
            home_route: "/".to_string(),
            refresh_window_secs: EXPIRY_WINDOW_SECS,
            keepalive_interval_secs: None,
            request_timeout_secs: 30,
            data_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn keepalive_interval(&self) -> Duration {
        let secs = self.keepalive_interval_secs.unwrap_or_else(|| {
            u64::try_from(self.refresh_window_secs / 2)
                .unwrap_or(1)
                .max(1)
        });
        Duration::from_secs(secs)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject values that would make the client misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() {
            return Err(Error::Config("api_url is empty".into()));
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "api_url must start with http:// or https://, got {}",
                self.api_url
            )));
        }
        if !self.login_route.starts_with('/') || !self.home_route.starts_with('/') {
            return Err(Error::Config("routes must be absolute paths".into()));
        }
        if self.login_route == self.home_route {
            return Err(Error::Config(
                "login_route and home_route must differ".into(),
            ));
        }
        if self.refresh_window_secs <= 0 {
            return Err(Error::Config("refresh_window_secs must be positive".into()));
        }
        if let Some(interval) = self.keepalive_interval_secs {
            if interval == 0 {
                return Err(Error::Config("keepalive_interval_secs must be positive".into()));
            }
            if i64::try_from(interval).unwrap_or(i64::MAX) >= self.refresh_window_secs {
                return Err(Error::Config(format!(
                    "keepalive_interval_secs ({interval}) must be shorter than refresh_window_secs ({})",
                    self.refresh_window_secs
                )));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config() -> Result<ClientConfig> {
    let mut config = match global_config_path() {
        Some(path) if path.exists() => load_config_file(&path)?,
        _ => ClientConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ringside").join("settings.json"))
}

pub fn load_config_file(path: &Path) -> Result<ClientConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Apply `RINGSIDE_*` overrides. `lookup` is injected so tests do not touch
/// the process environment.
fn apply_env_overrides(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("RINGSIDE_API_URL") {
        config.api_url = val;
    }
    if let Some(val) = lookup("RINGSIDE_LOGIN_ROUTE") {
        config.login_route = val;
    }
    if let Some(val) = lookup("RINGSIDE_HOME_ROUTE") {
        config.home_route = val;
    }
    if let Some(n) = lookup("RINGSIDE_REFRESH_WINDOW_SECS").and_then(|v| v.parse().ok()) {
        config.refresh_window_secs = n;
    }
    if let Some(n) = lookup("RINGSIDE_KEEPALIVE_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
        config.keepalive_interval_secs = Some(n);
    }
    if let Some(n) = lookup("RINGSIDE_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.request_timeout_secs = n;
    }
    if let Some(val) = lookup("RINGSIDE_DATA_DIR") {
        config.data_dir = Some(PathBuf::from(val));
    }
}
