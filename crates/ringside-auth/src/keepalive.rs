//! Periodic token keepalive.
//!
//! While a session exists, a background task checks the token on a fixed
//! interval and refreshes it ahead of expiry. A failed refresh logs out. The
//! task ends on its own once the session disappears.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::manager::AuthManager;

/// Handle to a running keepalive task. Dropping it stops the task.
#[derive(Debug)]
pub struct Keepalive {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Keepalive {
    pub fn spawn(manager: Arc<AuthManager>, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(manager, period, cancel.clone()));
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the task and wait for it to exit. A tick already in progress
    /// finishes first.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Keepalive task failed");
            }
        }
    }
}

impl Drop for Keepalive {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(manager: Arc<AuthManager>, period: Duration, cancel: CancellationToken) {
    let mut changes = manager.store().subscribe();
    let mut timer = tokio::time::interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer.tick().await; // Skip first immediate tick

    info!(period_secs = period.as_secs(), "Keepalive started");
    loop {
        if manager.store().token().is_none() {
            info!("No session; keepalive stopping");
            return;
        }

        tokio::select! {
            () = cancel.cancelled() => {
                debug!("Keepalive cancelled");
                return;
            }
            _ = timer.tick() => {
                let generation = manager.store().generation();
                match manager.ensure_valid_token().await {
                    Ok(_) => debug!("Keepalive tick complete"),
                    Err(AuthError::RefreshFailed { requires_login: true, .. }) => {
                        info!("Server requires a new login; keepalive stopping");
                        return;
                    }
                    Err(e) if manager.store().generation() != generation => {
                        debug!(error = %e, "Session changed during keepalive refresh");
                    }
                    Err(e) => {
                        warn!(error = %e, "Keepalive refresh failed; logging out");
                        manager.logout(None);
                        return;
                    }
                }
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}
