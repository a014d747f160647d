//! Session Store contract
//!
//! Durable per-session state keyed by an opaque session id. The engine
//! serializes turns per key, so implementations only need each call to be
//! atomic on its own (full-document overwrite, last write wins).

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::RwLock;

use super::SessionState;
use crate::error::StoreError;

static UNSAFE_ID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_-]").unwrap());

/// Key-value persistence for chat sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session. `None` for unseen ids; unreadable records are also
    /// reported as `None` so the caller starts over.
    async fn load(&self, session_id: &str) -> Result<Option<SessionState>, StoreError>;

    /// Overwrite the stored record for `state.session_id`.
    async fn save(&self, state: &SessionState) -> Result<(), StoreError>;

    /// Remove a session. Returns whether anything was removed.
    async fn delete(&self, session_id: &str) -> Result<bool, StoreError>;

    /// Write an audit copy of a finished session, kept apart from the
    /// live record.
    async fn snapshot(&self, state: &SessionState) -> Result<(), StoreError>;
}

/// File-name-safe form of a session id.
pub fn sanitize_session_id(session_id: &str) -> String {
    let safe = UNSAFE_ID_CHARS.replace_all(session_id, "_");
    if safe.is_empty() {
        "_".to_string()
    } else {
        safe.into_owned()
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store, used by tests and ephemeral chat sessions.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
    snapshots: RwLock<Vec<SessionState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots written so far, oldest first.
    pub async fn snapshots(&self) -> Vec<SessionState> {
        self.snapshots.read().await.clone()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionState>, StoreError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(state.session_id.clone(), state.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }

    async fn snapshot(&self, state: &SessionState) -> Result<(), StoreError> {
        self.snapshots.write().await.push(state.clone());
        Ok(())
    }
}
