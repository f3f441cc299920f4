//! Authenticated request wrapper.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::{CHANGE_PASSWORD_PATH, ChangePassword};
use crate::error::AuthError;
use crate::manager::AuthManager;
use crate::transport::{ApiRequest, ApiResponse};

/// Sends API calls with a valid bearer token attached.
///
/// Refreshes a token that is about to expire before sending, and turns a
/// server demand for re-login into a logout.
#[derive(Debug, Clone)]
pub struct AuthedClient {
    manager: Arc<AuthManager>,
}

impl AuthedClient {
    pub const fn new(manager: Arc<AuthManager>) -> Self {
        Self { manager }
    }

    pub const fn manager(&self) -> &Arc<AuthManager> {
        &self.manager
    }

    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        let store = self.manager.store();
        let generation = store.generation();
        let Some(token) = store.token() else {
            return Err(AuthError::NoToken);
        };

        if self.manager.is_stale(&token) {
            debug!(path = %request.path, "Token near expiry; refreshing before request");
            if let Err(e) = self.manager.ensure_valid_token().await {
                warn!(error = %e, path = %request.path, "Refresh before request failed");
                self.logout_after_failed_refresh(&e, generation);
                return Err(AuthError::AuthenticationFailed(e.to_string()));
            }
        }

        // Another caller may have rotated the token while we waited.
        let Some(token) = store.token() else {
            return Err(AuthError::NoToken);
        };
        let request = request.authorized(&token)?;
        let path = request.path.clone();
        let response = self.manager.transport().send(request).await?;

        if response.status == 401 && response.requires_login() {
            warn!(path = %path, "Server requires a new login");
            self.manager.logout(None);
            return Err(AuthError::AuthenticationRequired);
        }
        Ok(response)
    }

    /// Log out unless the manager already did, or the session this request
    /// started with has since been replaced or cleared.
    fn logout_after_failed_refresh(&self, error: &AuthError, generation: u64) {
        if matches!(
            error,
            AuthError::RefreshFailed {
                requires_login: true,
                ..
            }
        ) {
            return;
        }
        if self.manager.store().generation() != generation {
            debug!("Session changed during refresh; leaving it in place");
            return;
        }
        self.manager.logout(None);
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, AuthError> {
        self.request(ApiRequest::get(path)).await
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<ApiResponse, AuthError> {
        self.request(ApiRequest::post(path).json(body)).await
    }

    /// Change the logged-in user's password. Non-success answers become
    /// [`AuthError::Api`].
    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), AuthError> {
        let body = serde_json::to_value(ChangePassword {
            current_password: current.to_string(),
            new_password: new.to_string(),
        })
        .map_err(|e| AuthError::Decode(e.to_string()))?;
        self.post_json(CHANGE_PASSWORD_PATH, body)
            .await?
            .error_for_status()?;
        Ok(())
    }
}
