//! RAG (Retrieval-Augmented Generation) Interfaces
//!
//! The engine talks to four external capabilities through these traits:
//! an embedding model, a completion model, a persistent vector store and the
//! read-only relational source store. Concrete implementations live in
//! `fitrag-providers`, `fitrag-store` and [`crate::store`].

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{Document, Metadata, MetadataFilter};
use crate::error::{Error, Result};
use crate::loader::{ExerciseRecord, FoodItemRecord};

/// Interface for embeddings providers
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Generate an embedding for a document that will be stored
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate an embedding for a search query
    ///
    /// Providers that distinguish query and document embeddings override this.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text).await
    }

    /// Model identifier, reported in status output
    fn model(&self) -> &str;
}

/// Await a provider call for at most `timeout`
pub(crate) async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| Error::ProviderTimeout {
            timeout_secs: timeout.as_secs(),
        })?
}

/// A single-turn completion request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    /// Full prompt text
    pub prompt: String,
    /// Optional temperature setting
    pub temperature: Option<f64>,
    /// Optional max output tokens
    pub max_tokens: Option<u64>,
}

impl CompletionRequest {
    /// Request with provider defaults
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

/// Interface for generative completion providers
///
/// Single turn, no tool use.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Complete the prompt and return the raw generated text
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Model identifier, reported in status output
    fn model(&self) -> &str;
}

/// Description of a named collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name
    pub name: String,
    /// Free-form collection metadata
    pub metadata: BTreeMap<String, String>,
    /// Number of stored vectors
    pub count: usize,
}

/// One embedded document ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// Document id, unique within the collection
    pub id: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Scalar metadata
    pub metadata: Metadata,
    /// Document text
    pub text: String,
}

impl VectorRecord {
    /// Pair a document with its embedding
    pub fn from_document(document: &Document, embedding: Vec<f32>) -> Self {
        Self {
            id: document.id.clone(),
            embedding,
            metadata: document.metadata.clone(),
            text: document.text.clone(),
        }
    }
}

/// A document with its similarity to the query (higher is closer)
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    /// The retrieved document
    pub document: Document,
    /// Similarity score
    pub score: f32,
}

/// Interface for persistent vector stores organised in named collections
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create an empty collection; fails if it already exists
    async fn create_collection(&self, name: &str, metadata: BTreeMap<String, String>)
        -> Result<()>;

    /// Look up a collection, `None` if absent
    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>>;

    /// Drop a collection and its vectors; returns whether it existed
    async fn delete_collection(&self, name: &str) -> Result<bool>;

    /// Number of vectors in a collection; fails if the collection is absent
    async fn count(&self, name: &str) -> Result<usize>;

    /// Insert or replace records by id
    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> Result<()>;

    /// Top-`k` records most similar to `embedding` among those matching `filter`,
    /// most similar first
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        filter: &MetadataFilter,
        k: usize,
    ) -> Result<Vec<ScoredDocument>>;

    /// Point `alias` at `collection`, replacing any previous target
    async fn set_alias(&self, alias: &str, collection: &str) -> Result<()>;

    /// Current target of `alias`
    async fn resolve_alias(&self, alias: &str) -> Result<Option<String>>;
}

/// Row counts of the source store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    /// Rows in the exercise table
    pub exercises: usize,
    /// Rows in the food item table
    pub food_items: usize,
}

/// Read-only access to the relational source records
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// All exercises, ordered by id
    async fn exercises(&self) -> Result<Vec<ExerciseRecord>>;

    /// All food items, ordered by id
    async fn food_items(&self) -> Result<Vec<FoodItemRecord>>;

    /// Row counts per table
    async fn counts(&self) -> Result<SourceCounts> {
        Ok(SourceCounts {
            exercises: self.exercises().await?.len(),
            food_items: self.food_items().await?.len(),
        })
    }
}
