//! Persisted session store.
//!
//! Two-phase initialisation: [`SessionStore::new`] yields a store that is not
//! yet hydrated; [`SessionStore::hydrate`] loads the persisted session once,
//! flips the hydration flag and wakes every subscriber. State lives in a
//! `tokio::sync::watch` channel so readers take cheap snapshots and
//! components can await changes (hydration, token rotation, logout).

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::session::Session;
use crate::storage::KeyValueStorage;

/// Storage key holding the serialized session.
pub const SESSION_KEY: &str = "ringside.session";

const PERSIST_VERSION: u32 = 1;

/// Point-in-time view of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub session: Option<Session>,
    /// Set once the persisted value has been loaded. Never persisted.
    pub hydrated: bool,
    /// Bumped whenever a session is established or cleared; unchanged by an
    /// in-place refresh.
    pub generation: u64,
}

impl StoreSnapshot {
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(Session::token)
    }
}

#[derive(Serialize, Deserialize)]
struct Persisted {
    version: u32,
    session: Option<Session>,
}

struct Inner {
    state: watch::Sender<StoreSnapshot>,
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    /// Serialises writes to storage so the last write always reflects the
    /// latest in-memory state.
    persist_lock: Mutex<()>,
}

/// Shared handle to the session store. Cloning is cheap.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("key", &self.inner.key)
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create an un-hydrated store over `storage` using [`SESSION_KEY`].
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_key(storage, SESSION_KEY)
    }

    pub fn with_key(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        let (state, _) = watch::channel(StoreSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                state,
                storage,
                key: key.into(),
                persist_lock: Mutex::new(()),
            }),
        }
    }

    /// Load the persisted session and mark the store hydrated.
    ///
    /// Runs at most once; later calls return immediately. Corrupt or
    /// invariant-violating data is discarded and the store hydrates as
    /// logged out. A storage read failure still marks the store hydrated (as
    /// logged out) so nothing waits forever, and the error is returned.
    #[allow(clippy::unused_async)]
    pub async fn hydrate(&self) -> Result<()> {
        if self.is_hydrated() {
            debug!("Session store already hydrated");
            return Ok(());
        }

        let (session, outcome) = match self.inner.storage.get(&self.inner.key) {
            Ok(Some(raw)) => match parse_persisted(&raw) {
                Ok(session) => (session, Ok(())),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable persisted session");
                    if let Err(e) = self.inner.storage.remove(&self.inner.key) {
                        warn!(error = %e, "Failed to remove unreadable persisted session");
                    }
                    (None, Ok(()))
                }
            },
            Ok(None) => (None, Ok(())),
            Err(e) => {
                warn!(error = %e, "Failed to load persisted session");
                (None, Err(e))
            }
        };

        self.inner.state.send_modify(|state| {
            if state.hydrated {
                return;
            }
            // A session established while loading wins over the stored one.
            if state.session.is_none() {
                state.session = session;
            }
            state.hydrated = true;
        });
        info!(
            logged_in = self.inner.state.borrow().session.is_some(),
            "Session store hydrated"
        );
        outcome
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.state.borrow().session.clone()
    }

    /// Current bearer token, read fresh on every call.
    pub fn token(&self) -> Option<String> {
        self.inner.state.borrow().token().map(str::to_string)
    }

    pub fn generation(&self) -> u64 {
        self.inner.state.borrow().generation
    }

    pub fn is_hydrated(&self) -> bool {
        self.inner.state.borrow().hydrated
    }

    /// Resolve once [`hydrate`](Self::hydrate) has completed.
    pub async fn wait_hydrated(&self) {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx.wait_for(|state| state.hydrated).await;
    }

    /// Receiver notified on every store mutation.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.inner.state.subscribe()
    }

    /// Establish a new session (login/signup). Returns the new generation.
    pub fn set_session(&self, session: Session) -> u64 {
        let mut generation = 0;
        self.inner.state.send_modify(|state| {
            state.generation += 1;
            state.session = Some(session);
            generation = state.generation;
        });
        debug!(generation, "Session established");
        self.persist();
        generation
    }

    /// Replace token and profile together, but only if the store is still on
    /// `generation` and logged in. Returns whether the session was replaced.
    pub fn replace_if_current(&self, generation: u64, session: Session) -> bool {
        let replaced = self.inner.state.send_if_modified(|state| {
            if state.generation != generation || state.session.is_none() {
                return false;
            }
            state.session = Some(session);
            true
        });
        if replaced {
            debug!(generation, "Session refreshed in place");
            self.persist();
        } else {
            debug!(generation, "Stale session replacement discarded");
        }
        replaced
    }

    /// Remove the session. Returns whether one was present; clearing an
    /// empty store changes nothing.
    pub fn clear(&self) -> bool {
        let cleared = self.inner.state.send_if_modified(|state| {
            if state.session.is_none() {
                return false;
            }
            state.session = None;
            state.generation += 1;
            true
        });
        if cleared {
            debug!("Session cleared");
            self.persist();
        }
        cleared
    }

    /// Write the current in-memory session to storage. Failures are logged;
    /// the in-memory state stays authoritative for this process.
    fn persist(&self) {
        let Ok(_guard) = self.inner.persist_lock.lock() else {
            warn!("Session persist lock poisoned; skipping write");
            return;
        };
        let session = self.inner.state.borrow().session.clone();
        let result = match session {
            Some(session) => serde_json::to_string(&Persisted {
                version: PERSIST_VERSION,
                session: Some(session),
            })
            .map_err(Error::from)
            .and_then(|json| self.inner.storage.set(&self.inner.key, &json)),
            None => self.inner.storage.remove(&self.inner.key),
        };
        if let Err(e) = result {
            warn!(error = %e, key = %self.inner.key, "Failed to persist session");
        }
    }
}

fn parse_persisted(raw: &str) -> Result<Option<Session>> {
    let persisted: Persisted = serde_json::from_str(raw)?;
    if persisted.version != PERSIST_VERSION {
        return Err(Error::InvalidSession(format!(
            "unsupported persisted version {}",
            persisted.version
        )));
    }
    if let Some(session) = &persisted.session {
        session.validate()?;
    }
    Ok(persisted.session)
}
