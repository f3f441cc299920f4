//! In-memory fakes for exercising the auth client without a backend.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use ringside_core::token::{now_secs, test_token};
use ringside_core::{ClientConfig, MemoryStorage, Role, Session, SessionStore, UserProfile};

use crate::api::REFRESH_PATH;
use crate::error::AuthError;
use crate::manager::AuthManager;
use crate::navigator::Navigator;
use crate::transport::{ApiRequest, ApiResponse, Transport};

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, AuthError> + Send + Sync;

/// Transport answering from a closure and recording every request.
pub struct FakeTransport {
    handler: Box<Handler>,
    delay: Option<Duration>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, AuthError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with 200 and an empty JSON object.
    pub fn ok() -> Self {
        Self::new(|_| Ok(ApiResponse::new(200, "{}")))
    }

    /// Sleep (on the tokio clock) before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests sent to `path`.
    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    pub fn refresh_count(&self) -> usize {
        self.count(REFRESH_PATH)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(&request)
    }
}

/// Navigator that remembers where it was sent.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<String> {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}

pub fn profile(id: &str, role: Role) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        email: format!("{id}@ringside.test"),
        role,
        first_name: None,
        last_name: None,
    }
}

/// Token expiring an hour from now.
pub fn fresh_token(subject: &str) -> String {
    test_token(subject, now_secs() + 3600)
}

/// Token expiring inside the refresh window.
pub fn stale_token(subject: &str) -> String {
    test_token(subject, now_secs() + 60)
}

pub fn session(token: &str, role: Role) -> Session {
    #[allow(clippy::expect_used)]
    Session::new(token, profile("u1", role)).expect("test token is non-empty")
}

/// `200 { success: true, token, user }`.
pub fn refresh_success(token: &str, user: &UserProfile) -> ApiResponse {
    ApiResponse::from_json(
        200,
        &json!({ "success": true, "token": token, "user": user }),
    )
}

/// `401 { success: false, requiresLogin: true }`.
pub fn requires_login() -> ApiResponse {
    ApiResponse::from_json(
        401,
        &json!({ "success": false, "requiresLogin": true, "message": "Session expired" }),
    )
}

/// A hydrated store, manager and fakes wired together.
pub struct Harness {
    pub store: SessionStore,
    pub transport: Arc<FakeTransport>,
    pub navigator: Arc<RecordingNavigator>,
    pub manager: Arc<AuthManager>,
}

impl Harness {
    pub async fn new(transport: FakeTransport, session: Option<Session>) -> Self {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        #[allow(clippy::expect_used)]
        store.hydrate().await.expect("memory storage cannot fail");
        if let Some(session) = session {
            store.set_session(session);
        }
        let transport = Arc::new(transport);
        let navigator = Arc::new(RecordingNavigator::default());
        let manager = Arc::new(AuthManager::new(
            store.clone(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&navigator) as Arc<dyn Navigator>,
            &ClientConfig::default(),
        ));
        Self {
            store,
            transport,
            navigator,
            manager,
        }
    }
}
