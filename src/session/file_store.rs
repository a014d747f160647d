//! JSON file session store
//!
//! One pretty-printed JSON record per session under a history directory,
//! named by the sanitized session id. Ids that needed sanitizing also get a
//! short digest of the raw id, so "a b" and "a_b" never share a file.
//! Writes go to a temp file first and are renamed into place, so a crash
//! never leaves a half-written record.
//! Finished sessions are copied to `snapshots/<id>_<UTC timestamp>.json`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use super::store::{sanitize_session_id, SessionStore};
use super::SessionState;
use crate::error::StoreError;

const SNAPSHOT_DIR: &str = "snapshots";
const ID_DIGEST_LEN: usize = 12;

/// File stem of a session record.
pub fn record_stem(session_id: &str) -> String {
    let safe = sanitize_session_id(session_id);
    if safe == session_id {
        return safe;
    }
    let digest = hex::encode(Sha256::digest(session_id.as_bytes()));
    format!("{}-{}", safe, &digest[..ID_DIGEST_LEN])
}

/// Audit record written when a session completes a prediction.
#[derive(Debug, Serialize)]
struct SnapshotRecord<'a> {
    session_id: &'a str,
    timestamp: DateTime<Utc>,
    inputs: &'a std::collections::HashMap<String, crate::schema::SlotValue>,
    conversation: &'a [super::ConversationEntry],
}

/// Directory-backed session store.
pub struct JsonFileSessionStore {
    dir: PathBuf,
}

impl JsonFileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_DIR)
    }

    pub fn record_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", record_stem(session_id)))
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::io(path, e))
    }
}

#[async_trait]
impl SessionStore for JsonFileSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionState>, StoreError> {
        let path = self.record_path(session_id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };

        match serde_json::from_str::<SessionState>(&content) {
            Ok(state) if state.session_id == session_id => Ok(Some(state)),
            Ok(state) => {
                warn!(
                    session_id = %session_id,
                    stored_id = %state.session_id,
                    path = %path.display(),
                    "Session record belongs to another id, starting a new session"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    path = %path.display(),
                    error = %e,
                    "Malformed session record, starting a new session"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(state).map_err(|e| StoreError::Serialize {
            session_id: state.session_id.clone(),
            source: e,
        })?;
        let path = self.record_path(&state.session_id);
        self.write_atomic(&path, &bytes).await?;
        debug!(session_id = %state.session_id, path = %path.display(), "Saved session");
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool, StoreError> {
        let path = self.record_path(session_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    async fn snapshot(&self, state: &SessionState) -> Result<(), StoreError> {
        let now = Utc::now();
        let record = SnapshotRecord {
            session_id: &state.session_id,
            timestamp: now,
            inputs: &state.inputs,
            conversation: &state.conversation,
        };
        let bytes = serde_json::to_vec_pretty(&record).map_err(|e| StoreError::Serialize {
            session_id: state.session_id.clone(),
            source: e,
        })?;

        let stem = format!(
            "{}_{}",
            sanitize_session_id(&state.session_id),
            now.format("%Y%m%dT%H%M%SZ")
        );
        let dir = self.snapshot_dir();
        let mut path = dir.join(format!("{}.json", stem));
        let mut n = 1;
        while fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?
        {
            path = dir.join(format!("{}-{}.json", stem, n));
            n += 1;
        }

        self.write_atomic(&path, &bytes).await?;
        debug!(session_id = %state.session_id, path = %path.display(), "Wrote session snapshot");
        Ok(())
    }
}
