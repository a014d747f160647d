//! bidchat: slot-filling chat agent for freelance bid prediction
//!
//! Collects a fixed set of project variables over free-text chat turns,
//! normalizes each answer against a schema, persists per-session progress
//! and, once every variable is known, asks a prediction model for the bid
//! outcome.
//!
//! ```ignore
//! use bidchat::config::ChatConfig;
//!
//! let engine = ChatConfig::default().build_engine()?;
//! let reply = engine.respond("maybe around 500", "session-1").await;
//! println!("{}", reply.text);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod resolver;
pub mod schema;
pub mod session;

pub use config::ChatConfig;
pub use engine::{Command, DialogueEngine, TurnReply};
pub use error::{ChatError, ConfigError, GatewayError, StoreError};
pub use gateway::{
    BidModel, Dataset, DatasetGateway, FeatureVector, LinearBidModel, PredictionGateway,
    StubGateway,
};
pub use normalize::{normalize, Rejection};
pub use resolver::VariableResolver;
pub use schema::{Schema, SlotValue, Validator, Variable, VariableDef, VariableKind};
pub use session::{
    InMemorySessionStore, JsonFileSessionStore, Role, SessionState, SessionStore,
};
