//! Session State
//!
//! Per-session progress: collected values, the variable currently asked for,
//! and the append-only conversation log. The serialized form is the persisted
//! record shape:
//!
//! ```json
//! {
//!   "session_id": "...",
//!   "created_at": "...",
//!   "last_updated": "...",
//!   "inputs": { "Client_Budget_Min": 500 },
//!   "conversation": [{ "role": "user", "message": "500", "timestamp": "..." }],
//!   "awaiting_variable": "Client_Budget_Max"
//! }
//! ```

pub mod file_store;
pub mod store;

pub use file_store::JsonFileSessionStore;
pub use store::{sanitize_session_id, InMemorySessionStore, SessionStore};

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::{Schema, SlotValue};

/// Who said a conversation line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// One line of the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Progress of one chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,

    /// Collected values; absent key = unset
    #[serde(default)]
    pub inputs: HashMap<String, SlotValue>,

    #[serde(default)]
    pub conversation: Vec<ConversationEntry>,

    /// Variable the last prompt asked for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awaiting_variable: Option<String>,
}

impl SessionState {
    /// Fresh session awaiting the schema's first variable.
    pub fn new(session_id: impl Into<String>, schema: &Schema) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            created_at: now,
            last_updated: now,
            inputs: HashMap::new(),
            conversation: Vec::new(),
            awaiting_variable: Some(schema.first().name.clone()),
        }
    }

    /// Append a line to the conversation log.
    pub fn record(&mut self, role: Role, message: impl Into<String>) {
        let now = Utc::now();
        self.conversation.push(ConversationEntry {
            role,
            message: message.into(),
            timestamp: now,
        });
        self.last_updated = now;
    }

    pub fn set_value(&mut self, variable: &str, value: SlotValue) {
        self.inputs.insert(variable.to_string(), value);
        self.last_updated = Utc::now();
    }

    pub fn value(&self, variable: &str) -> Option<&SlotValue> {
        self.inputs.get(variable)
    }

    /// Unset every value and await the first variable again.
    ///
    /// The conversation log is kept.
    pub fn clear_values(&mut self, schema: &Schema) {
        self.inputs.clear();
        self.awaiting_variable = Some(schema.first().name.clone());
        self.last_updated = Utc::now();
    }

    /// Drop values and awaited names the schema does not know.
    ///
    /// Returns the dropped keys. Empty category strings left by older records
    /// count as unset and are dropped too.
    pub fn retain_schema(&mut self, schema: &Schema) -> Vec<String> {
        let mut dropped: Vec<String> = self
            .inputs
            .iter()
            .filter(|(name, value)| {
                !schema.contains(name) || matches!(value, SlotValue::Category(s) if s.is_empty())
            })
            .map(|(name, _)| name.clone())
            .collect();
        dropped.sort();
        for name in &dropped {
            self.inputs.remove(name);
        }

        if let Some(awaiting) = &self.awaiting_variable {
            if !schema.contains(awaiting) {
                dropped.push(awaiting.clone());
                self.awaiting_variable = None;
            }
        }
        dropped
    }

    /// Values in schema order, skipping unset ones.
    pub fn ordered_values<'a>(&'a self, schema: &'a Schema) -> Vec<(&'a str, &'a SlotValue)> {
        schema
            .names()
            .filter_map(|name| self.inputs.get(name).map(|v| (name, v)))
            .collect()
    }
}
