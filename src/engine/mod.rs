//! Dialogue Engine
//!
//! One call per chat turn. The engine loads the session, handles interrupting
//! commands, works out which variable the utterance answers, normalizes it,
//! and moves the session along:
//!
//! ```text
//! collecting(v) --valid-->     collecting(next) | complete
//! collecting(v) --invalid-->   collecting(v)
//! complete      --predict ok--> collecting(first)
//! any           --reset-->     collecting(first)
//! any           --status-->    any
//! ```
//!
//! Turns for the same session are serialized; different sessions never
//! share state.

pub mod command;
pub mod response;

pub use command::Command;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::ChatError;
use crate::gateway::{FeatureVector, PredictionGateway};
use crate::normalize::normalize;
use crate::resolver::VariableResolver;
use crate::schema::Schema;
use crate::session::{Role, SessionState, SessionStore};

/// Reply to one chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub text: String,
    /// Variable the session now waits for
    pub awaiting: Option<String>,
}

pub struct DialogueEngine {
    schema: Arc<Schema>,
    resolver: VariableResolver,
    store: Arc<dyn SessionStore>,
    gateway: Arc<dyn PredictionGateway>,
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DialogueEngine {
    pub fn new(
        schema: Arc<Schema>,
        store: Arc<dyn SessionStore>,
        gateway: Arc<dyn PredictionGateway>,
    ) -> Self {
        let resolver = VariableResolver::new(&schema);
        Self {
            schema,
            resolver,
            store,
            gateway,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the default phrase table.
    pub fn with_resolver(mut self, resolver: VariableResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Greeting shown when a transport opens a conversation.
    pub fn greeting(&self) -> String {
        response::greeting(&self.schema)
    }

    /// Handle a turn, turning failures into an apology reply.
    pub async fn respond(&self, utterance: &str, session_id: &str) -> TurnReply {
        match self.handle_turn(utterance, session_id).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Chat turn failed");
                TurnReply {
                    text: response::apology(),
                    awaiting: None,
                }
            }
        }
    }

    /// Process one utterance for a session and persist the result.
    pub async fn handle_turn(
        &self,
        utterance: &str,
        session_id: &str,
    ) -> Result<TurnReply, ChatError> {
        let lock = self.session_lock(session_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.locked_turn(utterance, session_id).await
        };
        self.release_session_lock(session_id, lock).await;
        result
    }

    async fn locked_turn(&self, utterance: &str, session_id: &str) -> Result<TurnReply, ChatError> {
        let mut state = self.load_or_create(session_id).await?;
        state.record(Role::User, utterance);

        let Outcome { text, predicted } = self.process(&mut state, utterance).await?;

        state.record(Role::Bot, text.as_str());
        if predicted {
            self.finish_estimate(&mut state).await;
        }
        self.store.save(&state).await?;

        debug!(
            session_id = %session_id,
            awaiting = ?state.awaiting_variable,
            filled = self.schema.filled_count(&state.inputs),
            "Turn complete"
        );
        Ok(TurnReply {
            text,
            awaiting: state.awaiting_variable,
        })
    }

    async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.session_locks
            .lock()
            .await
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Drop the lock entry once no other turn holds or waits on it.
    async fn release_session_lock(&self, session_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.session_locks.lock().await;
        drop(lock);
        if locks
            .get(session_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(session_id);
        }
    }

    #[cfg(test)]
    async fn tracked_sessions(&self) -> usize {
        self.session_locks.lock().await.len()
    }

    async fn load_or_create(&self, session_id: &str) -> Result<SessionState, ChatError> {
        match self.store.load(session_id).await? {
            Some(mut state) => {
                let dropped = state.retain_schema(&self.schema);
                if !dropped.is_empty() {
                    warn!(session_id = %session_id, dropped = ?dropped, "Dropped values for unknown variables");
                }
                Ok(state)
            }
            None => {
                debug!(session_id = %session_id, "Starting new session");
                Ok(SessionState::new(session_id, &self.schema))
            }
        }
    }

    async fn process(&self, state: &mut SessionState, utterance: &str) -> Result<Outcome, ChatError> {
        if utterance.trim().is_empty() {
            return Ok(match self.schema.next_missing(&state.inputs) {
                Some(next) => response::prompt(&next.name),
                None => response::all_filled_hint(),
            }
            .into());
        }

        if let Some(command) = Command::parse(utterance) {
            debug!(session_id = %state.session_id, command = command.as_str(), "Command");
            return match command {
                Command::Status => Ok(response::status(&self.schema, state).into()),
                Command::Reset => Ok(self.reset(state).await?.into()),
                Command::Predict => Ok(self.predict(state).await),
            };
        }

        let target = match self.resolver.resolve(utterance) {
            Some(mentioned) => mentioned.to_string(),
            None => match state.awaiting_variable.clone() {
                Some(awaiting) => awaiting,
                None => return Ok(self.unresolved(state).into()),
            },
        };
        let Some(variable) = self.schema.get(&target) else {
            return Ok(self.unresolved(state).into());
        };

        match normalize(utterance, variable) {
            Err(rejection) => {
                debug!(
                    session_id = %state.session_id,
                    variable = %variable.name,
                    reason = %rejection,
                    "Rejected input"
                );
                state.awaiting_variable = Some(variable.name.clone());
                Ok(response::rejected(variable, &rejection).into())
            }
            Ok(value) => {
                let ack = response::acknowledged(&variable.name, &value);
                info!(session_id = %state.session_id, variable = %variable.name, value = %value, "Stored value");
                state.set_value(&variable.name, value);

                match self.schema.next_missing(&state.inputs) {
                    Some(next) => {
                        state.awaiting_variable = Some(next.name.clone());
                        Ok(format!("{}\n\n{}", ack, response::prompt(&next.name)).into())
                    }
                    None => {
                        state.awaiting_variable = None;
                        let outcome = self.run_prediction(state).await;
                        Ok(Outcome {
                            text: format!("{}\n\n{}", ack, outcome.text),
                            ..outcome
                        })
                    }
                }
            }
        }
    }

    /// No variable mentioned and none awaited.
    fn unresolved(&self, state: &mut SessionState) -> String {
        match self.schema.next_missing(&state.inputs) {
            Some(next) => {
                state.awaiting_variable = Some(next.name.clone());
                response::not_understood(&next.name)
            }
            None => response::all_filled_menu(),
        }
    }

    async fn reset(&self, state: &mut SessionState) -> Result<String, ChatError> {
        let removed = self.store.delete(&state.session_id).await?;
        info!(session_id = %state.session_id, removed, "Session reset");
        *state = SessionState::new(state.session_id.clone(), &self.schema);
        Ok(response::reset(&self.schema))
    }

    async fn predict(&self, state: &mut SessionState) -> Outcome {
        let missing = self.schema.missing(&state.inputs);
        if missing.is_empty() {
            return self.run_prediction(state).await;
        }

        let suggestion = self.gateway.suggest(&features(&self.schema, state)).await;
        response::missing_for_prediction(&missing, &suggestion).into()
    }

    /// Full prediction on a complete session.
    async fn run_prediction(&self, state: &SessionState) -> Outcome {
        let features = features(&self.schema, state);
        match self.gateway.predict(&features).await {
            Ok(prediction) => {
                info!(session_id = %state.session_id, prediction, "Prediction complete");
                Outcome {
                    text: response::prediction_result(prediction, &self.schema.first().name),
                    predicted: true,
                }
            }
            Err(e) => {
                warn!(session_id = %state.session_id, error = %e, "Prediction failed");
                response::prediction_failed(&e).into()
            }
        }
    }

    /// Snapshot the finished estimate, reply included, then start over.
    async fn finish_estimate(&self, state: &mut SessionState) {
        if let Err(e) = self.store.snapshot(state).await {
            error!(session_id = %state.session_id, error = %e, "Failed to write session snapshot");
        }
        state.clear_values(&self.schema);
    }
}

/// Reply text for a turn, and whether it completed an estimate.
struct Outcome {
    text: String,
    predicted: bool,
}

impl From<String> for Outcome {
    fn from(text: String) -> Self {
        Self {
            text,
            predicted: false,
        }
    }
}

/// Collected values in schema order.
fn features(schema: &Schema, state: &SessionState) -> FeatureVector {
    state
        .ordered_values(schema)
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::StubGateway;
    use crate::session::InMemorySessionStore;

    fn engine() -> DialogueEngine {
        DialogueEngine::new(
            Arc::new(Schema::default_bid_schema()),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(StubGateway::new(10.0)),
        )
    }

    #[tokio::test]
    async fn test_first_turn_creates_session() {
        let engine = engine();
        let reply = engine.handle_turn("", "fresh").await.unwrap();
        assert_eq!(reply.text, "Please enter a value for **Client_Budget_Min**:");
        assert_eq!(reply.awaiting.as_deref(), Some("Client_Budget_Min"));
    }

    #[tokio::test]
    async fn test_reset_on_unseen_session() {
        let engine = engine();
        let reply = engine.handle_turn("reset", "nobody").await.unwrap();
        assert!(reply.text.contains(&engine.greeting()));
    }

    #[tokio::test]
    async fn test_custom_resolver() {
        let schema = Schema::default_bid_schema();
        let resolver = VariableResolver::names_only(&schema);
        let engine = engine().with_resolver(resolver);

        // "max budget" is only a phrase; without the table the awaited
        // variable takes the number
        engine.handle_turn("max budget 900", "s").await.unwrap();
        let reply = engine.handle_turn("status", "s").await.unwrap();
        assert!(reply.text.contains("• Client_Budget_Min: 900"));
    }

    #[tokio::test]
    async fn test_session_locks_are_released() {
        let engine = engine();
        engine.handle_turn("500", "a").await.unwrap();
        engine.handle_turn("status", "b").await.unwrap();
        assert_eq!(engine.tracked_sessions().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_session_locks_released_after_concurrent_turns() {
        let engine = Arc::new(engine());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    let session = format!("s{}", i % 3);
                    engine.handle_turn("hello", &session).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(engine.tracked_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_holds_prediction_reply() {
        let schema = Arc::new(Schema::new(vec![crate::schema::Variable::numeric("A")]).unwrap());
        let store = Arc::new(InMemorySessionStore::new());
        let engine = DialogueEngine::new(schema, store.clone(), Arc::new(StubGateway::new(7.5)));

        engine.handle_turn("3", "s").await.unwrap();

        let snapshots = store.snapshots().await;
        assert_eq!(snapshots.len(), 1);
        let last = snapshots[0].conversation.last().unwrap();
        assert_eq!(last.role, Role::Bot);
        assert!(last.message.contains("**Prediction Result:** 7.50"));
        assert_eq!(snapshots[0].value("A"), Some(&crate::schema::SlotValue::Integer(3)));
    }

    #[test]
    fn test_features_follow_schema_order() {
        let schema = Schema::default_bid_schema();
        let mut state = SessionState::new("s", &schema);
        state.set_value("Location", crate::schema::SlotValue::Category("USA".into()));
        state.set_value("Client_Budget_Min", crate::schema::SlotValue::Integer(1));

        let names: Vec<String> = features(&schema, &state).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Client_Budget_Min", "Location"]);
    }
}
