//! Auth manager: token refresh with coalescing, logout, account operations.
//!
//! One [`AuthManager`] is built per process and shared as `Arc<AuthManager>`.
//! At most one refresh call is in flight at a time: the first caller to find
//! the token stale leads the refresh, later callers queue a oneshot waiter
//! and receive the leader's outcome.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use ringside_core::token::{self, now_secs};
use ringside_core::{ClientConfig, Session, SessionStore};

use crate::api::{
    AuthResponse, Credentials, LOGIN_PATH, LoginOutcome, REFRESH_PATH, RefreshResponse,
    Registration, SIGNUP_PATH, login_failure_message,
};
use crate::error::AuthError;
use crate::navigator::Navigator;
use crate::transport::{ApiRequest, ApiResponse, Transport};

type RefreshOutcome = Result<String, AuthError>;

/// Application routes the manager and guard redirect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    pub login: String,
    pub home: String,
}

impl Routes {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            login: config.login_route.clone(),
            home: config.home_route.clone(),
        }
    }
}

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

pub struct AuthManager {
    store: SessionStore,
    transport: Arc<dyn Transport>,
    navigator: Arc<dyn Navigator>,
    routes: Routes,
    refresh_window_secs: i64,
    refresh: Mutex<RefreshState>,
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("store", &self.store)
            .field("routes", &self.routes)
            .field("refresh_window_secs", &self.refresh_window_secs)
            .finish_non_exhaustive()
    }
}

impl AuthManager {
    pub fn new(
        store: SessionStore,
        transport: Arc<dyn Transport>,
        navigator: Arc<dyn Navigator>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            store,
            transport,
            navigator,
            routes: Routes::from_config(config),
            refresh_window_secs: config.refresh_window_secs,
            refresh: Mutex::new(RefreshState::default()),
        }
    }

    pub const fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub const fn routes(&self) -> &Routes {
        &self.routes
    }

    /// Whether `token` is within the refresh window (or unreadable).
    pub fn is_stale(&self, token: &str) -> bool {
        token::is_expired_at(Some(token), now_secs(), self.refresh_window_secs)
    }

    /// Hard-navigate without touching the session.
    pub fn redirect(&self, path: &str) {
        self.navigator.navigate(path);
    }

    /// Return a usable token, refreshing it first if it is about to expire.
    ///
    /// `Ok(None)` means there is no session. Concurrent callers that find the
    /// token stale share a single refresh call and all observe its outcome.
    pub async fn ensure_valid_token(&self) -> Result<Option<String>, AuthError> {
        let Some(current) = self.store.token() else {
            return Ok(None);
        };
        if !self.is_stale(&current) {
            return Ok(Some(current));
        }

        let waiter = {
            let mut state = self.lock_refresh();
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Some(rx)
            } else {
                // A refresh may have landed between the check above and the lock.
                match self.store.token() {
                    None => return Ok(None),
                    Some(token) if !self.is_stale(&token) => return Ok(Some(token)),
                    Some(_) => {}
                }
                state.in_flight = true;
                None
            }
        };

        if let Some(rx) = waiter {
            debug!("Waiting on in-flight token refresh");
            let outcome = rx.await.unwrap_or_else(|_| Err(cancelled()));
            return outcome.map(Some);
        }

        let mut in_flight = InFlight {
            state: &self.refresh,
            outcome: None,
        };
        let outcome = self.refresh_token().await;
        in_flight.outcome = Some(outcome.clone());
        drop(in_flight);
        outcome.map(Some)
    }

    /// Exchange the current token for a new one.
    ///
    /// On success token and profile are replaced together. A server answer
    /// carrying `requiresLogin: true` logs out before the error is returned.
    /// If the session was replaced or cleared while the call was in flight,
    /// the result is dropped and [`AuthError::SessionSuperseded`] returned.
    pub async fn refresh_token(&self) -> Result<String, AuthError> {
        let generation = self.store.generation();
        let Some(current) = self.store.token() else {
            return Err(AuthError::NoToken);
        };

        debug!(generation, "Refreshing session token");
        let request = ApiRequest::post(REFRESH_PATH).authorized(&current)?;
        let response = self.transport.send(request).await.map_err(|e| {
            warn!(error = %e, "Token refresh request failed");
            AuthError::RefreshFailed {
                reason: e.to_string(),
                status: None,
                requires_login: false,
            }
        })?;

        let body: RefreshResponse = response.json().unwrap_or_default();
        if response.is_success() && body.success {
            if let (Some(token), Some(user)) = (body.token.clone(), body.user.clone()) {
                let session = Session::new(token, user).map_err(|e| AuthError::RefreshFailed {
                    reason: e.to_string(),
                    status: Some(response.status),
                    requires_login: false,
                })?;
                let token = session.token().to_string();
                if self.store.replace_if_current(generation, session) {
                    info!("Session token refreshed");
                    return Ok(token);
                }
                info!("Session changed during refresh; discarding new token");
                return Err(AuthError::SessionSuperseded);
            }
        }

        Err(self.refresh_failure(generation, &response, body))
    }

    fn refresh_failure(
        &self,
        generation: u64,
        response: &ApiResponse,
        body: RefreshResponse,
    ) -> AuthError {
        let reason = body.message.unwrap_or_else(|| {
            if response.is_success() {
                "refresh response did not include a session".to_string()
            } else {
                response.message()
            }
        });
        warn!(
            status = response.status,
            requires_login = body.requires_login,
            reason = %reason,
            "Token refresh rejected"
        );

        if body.requires_login {
            if self.store.generation() == generation {
                self.logout(None);
            } else {
                debug!("Session changed during refresh; not logging out");
            }
        }

        AuthError::RefreshFailed {
            reason,
            status: Some(response.status),
            requires_login: body.requires_login,
        }
    }

    /// Clear the session and hard-navigate to `redirect` (the login route by
    /// default). Safe to call when already logged out.
    pub fn logout(&self, redirect: Option<&str>) {
        if self.store.clear() {
            info!("Logged out");
        }
        self.navigator
            .navigate(redirect.unwrap_or(&self.routes.login));
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, AuthError> {
        let body = serde_json::to_value(credentials).map_err(|e| AuthError::Decode(e.to_string()))?;
        self.establish(ApiRequest::post(LOGIN_PATH).json(body).anonymous())
            .await
    }

    pub async fn signup(&self, registration: &Registration) -> Result<LoginOutcome, AuthError> {
        let body =
            serde_json::to_value(registration).map_err(|e| AuthError::Decode(e.to_string()))?;
        self.establish(ApiRequest::post(SIGNUP_PATH).json(body).anonymous())
            .await
    }

    /// Send a login/signup request and store the session it returns.
    async fn establish(&self, request: ApiRequest) -> Result<LoginOutcome, AuthError> {
        let path = request.path.clone();
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            let server_message = response.message();
            warn!(path = %path, status = response.status, "Authentication rejected");
            return Err(AuthError::Rejected {
                status: response.status,
                message: login_failure_message(response.status, Some(&server_message)),
            });
        }

        let body: AuthResponse = response.json()?;
        let (Some(token), Some(user)) = (body.token, body.user) else {
            return Err(AuthError::Decode(
                "auth response did not include a token and user".into(),
            ));
        };
        let session = Session::new(token, user.clone())?;
        let generation = self.store.set_session(session);
        info!(user_id = %user.id, role = %user.role, generation, "Logged in");
        Ok(LoginOutcome {
            user,
            message: body.message,
        })
    }

    fn lock_refresh(&self) -> MutexGuard<'_, RefreshState> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn cancelled() -> AuthError {
    AuthError::RefreshFailed {
        reason: "refresh was cancelled".into(),
        status: None,
        requires_login: false,
    }
}

/// Held by the refresh leader. Dropping it clears the in-flight flag and
/// hands the outcome to every waiter, including when the leader's future is
/// dropped mid-refresh.
struct InFlight<'a> {
    state: &'a Mutex<RefreshState>,
    outcome: Option<RefreshOutcome>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let waiters = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        let outcome = self.outcome.take().unwrap_or_else(|| Err(cancelled()));
        if !waiters.is_empty() {
            debug!(waiters = waiters.len(), "Resolving coalesced refresh waiters");
        }
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}
