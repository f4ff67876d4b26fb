//! Engine configuration
//!
//! One [`EngineConfig`] is built at startup and passed down. Every default
//! lives in the `Default` impls below. Values can come from YAML, and a small
//! set of environment variables overrides them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// API key for the generative and embedding provider
pub const ENV_API_KEY: &str = "GOOGLE_API_KEY";
/// Directory holding the persistent vector store
pub const ENV_VECTOR_DIR: &str = "CHROMA_PERSIST_DIR";
/// Path of the relational source database
pub const ENV_SOURCE_DB: &str = "FITRAG_SOURCE_DB";
/// Default log level
pub const ENV_LOG_LEVEL: &str = "FITRAG_LOG_LEVEL";

const VECTOR_DB_FILE: &str = "fitrag.db";

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Vector index settings
    pub index: IndexConfig,
    /// Retrieval settings
    pub retrieval: RetrievalConfig,
    /// Plan generation settings
    pub generation: GenerationConfig,
    /// Embedding settings
    pub embedding: EmbeddingConfig,
    /// Provider credentials
    pub provider: ProviderConfig,
    /// Storage locations
    pub storage: StorageConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Vector index settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Logical collection name (an alias onto the live generation)
    pub collection: String,
    /// Documents embedded per batch
    pub embed_batch_size: usize,
    /// Pause between batches, to stay under provider rate limits
    pub batch_pause_ms: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            collection: "fitfusion_collection".to_string(),
            embed_batch_size: 5,
            batch_pause_ms: 2000,
        }
    }
}

impl IndexConfig {
    /// Pause between batches
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

/// Retrieval settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Exercises retrieved for a workout plan
    pub exercise_top_k: usize,
    /// Food items retrieved for a diet plan
    pub food_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            exercise_top_k: 30,
            food_top_k: 20,
        }
    }
}

/// Plan generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Completion model
    pub model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Maximum output tokens
    pub max_output_tokens: u64,
    /// Upper bound on one completion call
    pub request_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.7,
            max_output_tokens: 8192,
            request_timeout_secs: 120,
        }
    }
}

impl GenerationConfig {
    /// Completion timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Embedding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model
    pub model: String,
    /// Upper bound on one embedding call
    pub request_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "models/embedding-001".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    /// Embedding call timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Provider credentials
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key
    pub api_key: Option<String>,
    /// Override of the provider base URL
    pub base_url: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Storage locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file backing the vector store
    pub vector_store_path: PathBuf,
    /// SQLite file holding the exercise and food item tables
    pub source_db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            vector_store_path: PathBuf::from("./chroma_db").join(VECTOR_DB_FILE),
            source_db_path: PathBuf::from("./fitfusion.db"),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for rotated log files
    pub directory: String,
    /// File name prefix
    pub file_prefix: String,
    /// Default level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_prefix: "fitrag.log".to_string(),
            level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse from YAML; absent keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| Error::Config(format!("invalid YAML: {e}")))
    }

    /// Load from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var(ENV_API_KEY) {
            self.provider.api_key = Some(key);
        }
        if let Some(dir) = var(ENV_VECTOR_DIR) {
            self.storage.vector_store_path = PathBuf::from(dir).join(VECTOR_DB_FILE);
        }
        if let Some(path) = var(ENV_SOURCE_DB) {
            self.storage.source_db_path = PathBuf::from(path);
        }
        if let Some(level) = var(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        self
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.index.collection.trim().is_empty() {
            return Err(Error::Config("index.collection must not be empty".into()));
        }
        if self.index.embed_batch_size == 0 {
            return Err(Error::Config("index.embed_batch_size must be > 0".into()));
        }
        if self.retrieval.exercise_top_k == 0 || self.retrieval.food_top_k == 0 {
            return Err(Error::Config("retrieval top-k values must be > 0".into()));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(Error::Config(format!(
                "generation.temperature must be within 0..=2, got {}",
                self.generation.temperature
            )));
        }
        if self.generation.max_output_tokens == 0 {
            return Err(Error::Config("generation.max_output_tokens must be > 0".into()));
        }
        if self.generation.request_timeout_secs == 0 || self.embedding.request_timeout_secs == 0 {
            return Err(Error::Config("request timeouts must be > 0".into()));
        }
        Ok(())
    }
}
