//! Route guard for protected views.
//!
//! A [`RouteGuard`] decides what a protected view shows. It renders a loading
//! state until the session store is hydrated, then validates the session once
//! per distinct token value. Re-polling with the same token reuses the last
//! verdict, so a redirect is issued once per token, not once per poll.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use ringside_core::Role;

use crate::manager::AuthManager;

/// Outcome of checking the current token with the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    /// `redirect` is false when the check failed for reasons unrelated to
    /// the credentials (network, server error); the session is kept.
    Invalid { redirect: bool },
}

#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self) -> Validation;
}

/// Validates by ensuring the token is fresh, refreshing if needed.
#[derive(Debug, Clone)]
pub struct ManagerValidator {
    manager: Arc<AuthManager>,
}

impl ManagerValidator {
    pub const fn new(manager: Arc<AuthManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl TokenValidator for ManagerValidator {
    async fn validate(&self) -> Validation {
        match self.manager.ensure_valid_token().await {
            Ok(Some(_)) => Validation::Valid,
            Ok(None) => Validation::Invalid { redirect: true },
            Err(e) => {
                let redirect = !e.is_transient();
                warn!(error = %e, redirect, "Token validation failed");
                Validation::Invalid { redirect }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    PendingHydration,
    Validating,
    Authorized,
    /// Validation could not reach a verdict; the session is kept.
    Degraded,
    Unauthorized { redirect: String },
}

/// What the protected view should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardView {
    Loading,
    Protected,
    Degraded,
    Nothing,
}

pub struct RouteGuard {
    manager: Arc<AuthManager>,
    validator: Arc<dyn TokenValidator>,
    required_role: Option<Role>,
    state: GuardState,
    /// Token value the current state was computed for. `Some(None)` means the
    /// check ran with no session.
    checked: Option<Option<String>>,
}

impl std::fmt::Debug for RouteGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGuard")
            .field("required_role", &self.required_role)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl RouteGuard {
    /// Guard backed by [`ManagerValidator`].
    pub fn new(manager: Arc<AuthManager>, required_role: Option<Role>) -> Self {
        let validator = Arc::new(ManagerValidator::new(Arc::clone(&manager)));
        Self::with_validator(manager, validator, required_role)
    }

    pub fn with_validator(
        manager: Arc<AuthManager>,
        validator: Arc<dyn TokenValidator>,
        required_role: Option<Role>,
    ) -> Self {
        Self {
            manager,
            validator,
            required_role,
            state: GuardState::PendingHydration,
            checked: None,
        }
    }

    pub const fn state(&self) -> &GuardState {
        &self.state
    }

    pub const fn view(&self) -> GuardView {
        match self.state {
            GuardState::PendingHydration | GuardState::Validating => GuardView::Loading,
            GuardState::Authorized => GuardView::Protected,
            GuardState::Degraded => GuardView::Degraded,
            GuardState::Unauthorized { .. } => GuardView::Nothing,
        }
    }

    /// Re-evaluate against the current store state.
    pub async fn poll(&mut self) -> GuardView {
        let store = self.manager.store();
        if !store.is_hydrated() {
            self.state = GuardState::PendingHydration;
            return GuardView::Loading;
        }

        let token = store.token();
        if self.checked.as_ref() == Some(&token) {
            return self.view();
        }

        self.state = GuardState::Validating;
        self.state = self.evaluate().await;
        self.checked = Some(self.manager.store().token());
        debug!(state = ?self.state, "Route guard evaluated");
        self.view()
    }

    /// Wait for hydration, then poll.
    pub async fn settle(&mut self) -> GuardView {
        self.manager.store().wait_hydrated().await;
        self.poll().await
    }

    /// Forget the last verdict so the next poll validates again.
    pub fn retry(&mut self) {
        self.checked = None;
    }

    /// Poll on every store change, reporting each view, until the guard
    /// ends up unauthorized. Returns the final state.
    pub async fn watch(&mut self, mut on_view: impl FnMut(GuardView) + Send) -> GuardState {
        let mut changes = self.manager.store().subscribe();
        loop {
            changes.mark_unchanged();
            let view = self.poll().await;
            on_view(view);
            if matches!(self.state, GuardState::Unauthorized { .. }) {
                return self.state.clone();
            }
            if changes.changed().await.is_err() {
                return self.state.clone();
            }
        }
    }

    async fn evaluate(&self) -> GuardState {
        let routes = self.manager.routes();
        let Some(session) = self.manager.store().session() else {
            info!(redirect = %routes.login, "No session; redirecting to login");
            self.manager.redirect(&routes.login);
            return GuardState::Unauthorized {
                redirect: routes.login.clone(),
            };
        };

        if let Some(required) = self.required_role {
            if session.role() != required {
                info!(
                    required = %required,
                    actual = %session.role(),
                    "Role not permitted; clearing session"
                );
                self.manager.logout(Some(&routes.home));
                return GuardState::Unauthorized {
                    redirect: routes.home.clone(),
                };
            }
        }

        match self.validator.validate().await {
            Validation::Valid => GuardState::Authorized,
            Validation::Invalid { redirect: true } => {
                self.manager.logout(None);
                GuardState::Unauthorized {
                    redirect: routes.login.clone(),
                }
            }
            Validation::Invalid { redirect: false } => GuardState::Degraded,
        }
    }
}
