//! Who is logged in.
//!
//! [`SessionState`] is the pure part: a value plus [`SessionState::apply`],
//! which maps an event to the next state. [`SessionStore`] owns the current
//! state and mirrors it into an injected [`KeyValueStore`] so it can be
//! restored by the next process.
//!
//! The durable mirror is never the source of truth. Whatever the last
//! `login`/`logout` set in memory wins.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::model::{AuthResponse, User};
use crate::storage::KeyValueStore;

/// Durable key for the bearer token.
pub const TOKEN_KEY: &str = "token";
/// Durable key for the serialized user record.
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    user: Option<User>,
    token: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    LoggedIn { user: User, token: String },
    Restored { user: User, token: String },
    LoggedOut,
}

impl SessionState {
    /// Next state after `event`. User and token are always set or cleared
    /// together; an empty token yields the logged-out state.
    pub fn apply(self, event: SessionEvent) -> SessionState {
        match event {
            SessionEvent::LoggedIn { user, token } | SessionEvent::Restored { user, token }
                if !token.is_empty() =>
            {
                SessionState {
                    user: Some(user),
                    token: Some(token),
                }
            }
            _ => SessionState::default(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// Holds the current session and its durable mirror.
///
/// Shared behind an `Arc` between the CLI and the gateway's auth layer; the
/// state sits behind a mutex that is only held for the duration of a single
/// transition.
pub struct SessionStore {
    state: Mutex<SessionState>,
    storage: Arc<dyn KeyValueStore>,
    authenticated: watch::Sender<bool>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SessionStore")
            .field("user", &state.user.as_ref().map(|u| &u.username))
            .field("authenticated", &state.is_authenticated())
            .finish()
    }
}

impl SessionStore {
    /// A logged-out store. Call [`load_from_storage`](Self::load_from_storage)
    /// to pick up a previous session.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (authenticated, _) = watch::channel(false);
        Self {
            state: Mutex::new(SessionState::default()),
            storage,
            authenticated,
        }
    }

    /// Construct and immediately restore from durable storage.
    pub fn restore(storage: Arc<dyn KeyValueStore>) -> Self {
        let store = Self::new(storage);
        store.load_from_storage();
        store
    }

    /// Start a session from a successful authentication result.
    ///
    /// Persists first, then switches the in-memory state. A failed write
    /// is logged; the in-memory session still becomes active.
    pub fn login(&self, auth: &AuthResponse) {
        let user = auth.user();
        match serde_json::to_string(&user) {
            Ok(json) => {
                if let Err(e) = self
                    .storage
                    .set(TOKEN_KEY, &auth.token)
                    .and_then(|()| self.storage.set(USER_KEY, &json))
                {
                    tracing::warn!("failed to persist session: {e}");
                }
            }
            Err(e) => tracing::warn!("failed to serialize user for storage: {e}"),
        }

        self.transition(SessionEvent::LoggedIn {
            user,
            token: auth.token.clone(),
        });
        tracing::debug!(username = %auth.username, "logged in");
    }

    /// End the session. Safe to call when already logged out.
    pub fn logout(&self) {
        self.clear_storage();
        self.transition(SessionEvent::LoggedOut);
    }

    /// Restore a session saved by a previous process.
    ///
    /// Needs both a non-empty token and a well-formed user record. Anything
    /// less leaves the in-memory state alone and removes whatever partial
    /// entries are lying around.
    pub fn load_from_storage(&self) {
        let token = self.read_entry(TOKEN_KEY).filter(|t| !t.is_empty());
        let user_json = self.read_entry(USER_KEY);

        let (Some(token), Some(user_json)) = (token, user_json) else {
            self.clear_storage();
            return;
        };

        match serde_json::from_str::<User>(&user_json) {
            Ok(user) => {
                tracing::debug!(username = %user.username, "restored session from storage");
                self.transition(SessionEvent::Restored { user, token });
            }
            Err(e) => {
                tracing::debug!("discarding malformed stored session: {e}");
                self.clear_storage();
            }
        }
    }

    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_authenticated()
    }

    /// Token currently in the durable mirror, regardless of in-memory state.
    pub fn stored_token(&self) -> Option<String> {
        self.read_entry(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// Observe the authenticated flag. The receiver sees every transition
    /// that changes it.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.authenticated.subscribe()
    }

    fn transition(&self, event: SessionEvent) {
        let authenticated = {
            let mut state = self.lock();
            let next = std::mem::take(&mut *state).apply(event);
            *state = next;
            state.is_authenticated()
        };
        self.authenticated.send_if_modified(|current| {
            let changed = *current != authenticated;
            *current = authenticated;
            changed
        });
    }

    fn read_entry(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(key, "failed to read session entry: {e}");
                None
            }
        }
    }

    fn clear_storage(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, "failed to clear session entry: {e}");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
