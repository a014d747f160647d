//! Chat Agent Configuration
//!
//! YAML configuration for the schema, extra resolver phrases, session storage
//! and the model/dataset locations. Every section is optional; an empty file
//! gives the built-in freelance bid setup.
//!
//! ```yaml
//! schema:
//!   - name: Client_Budget_Min
//!     kind: numeric
//!     non_negative: true
//! synonyms:
//!   - phrase: lowest budget
//!     variable: Client_Budget_Min
//! storage:
//!   history_dir: user_history
//! model:
//!   model_path: models/bid_model.yaml
//!   dataset_path: models/freelance_bids.csv
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::DialogueEngine;
use crate::error::ConfigError;
use crate::gateway::{DatasetGateway, PredictionGateway};
use crate::resolver::VariableResolver;
use crate::schema::{Schema, VariableDef};
use crate::session::{InMemorySessionStore, JsonFileSessionStore, SessionStore};

pub const DEFAULT_HISTORY_DIR: &str = "user_history";

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Variables in prompt order; empty means the built-in bid schema
    pub schema: Vec<VariableDef>,
    pub synonyms: Vec<SynonymDef>,
    pub storage: StorageConfig,
    pub model: ModelConfig,
}

/// Extra resolver phrase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynonymDef {
    pub phrase: String,
    pub variable: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub history_dir: PathBuf,
    /// Keep sessions in memory only
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_dir: PathBuf::from(DEFAULT_HISTORY_DIR),
            in_memory: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_path: Option<PathBuf>,
    pub dataset_path: Option<PathBuf>,
}

impl ChatConfig {
    /// Load from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::load_from_str(&content)
    }

    /// Load from a YAML string
    pub fn load_from_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load `path` if given, else the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn build_schema(&self) -> Result<Schema, ConfigError> {
        if self.schema.is_empty() {
            Ok(Schema::default_bid_schema())
        } else {
            Schema::from_definitions(self.schema.clone())
        }
    }

    pub fn build_resolver(&self, schema: &Schema) -> VariableResolver {
        VariableResolver::new(schema).with_synonyms(
            schema,
            self.synonyms
                .iter()
                .map(|s| (s.phrase.as_str(), s.variable.clone())),
        )
    }

    pub fn build_store(&self) -> Arc<dyn SessionStore> {
        if self.storage.in_memory {
            Arc::new(InMemorySessionStore::new())
        } else {
            Arc::new(JsonFileSessionStore::new(self.storage.history_dir.clone()))
        }
    }

    pub fn build_gateway(&self) -> Arc<dyn PredictionGateway> {
        Arc::new(DatasetGateway::new(
            self.model.model_path.clone(),
            self.model.dataset_path.clone(),
        ))
    }

    /// Wire a dialogue engine from this configuration.
    pub fn build_engine(&self) -> Result<DialogueEngine, ConfigError> {
        let schema = self.build_schema()?;
        let resolver = self.build_resolver(&schema);
        Ok(
            DialogueEngine::new(Arc::new(schema), self.build_store(), self.build_gateway())
                .with_resolver(resolver),
        )
    }
}
