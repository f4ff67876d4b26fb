//! Vector Index Manager
//!
//! Owns the lifecycle of the single logical collection: load it if a usable
//! one is persisted, otherwise build it from the source store.
//!
//! # Rebuild and concurrent reads
//!
//! The logical collection name is an alias onto a concrete generation
//! (`{name}__{suffix}`). A rebuild embeds the full snapshot into a new
//! generation while queries keep running against the current one. Only after
//! every batch has been written does it take the write side of the
//! active-index lock, repoint the alias and the in-process handle, and then
//! drop the previous generation. A failed rebuild deletes its own generation
//! and leaves the current one serving. Rebuilds, loads and initialization are
//! serialized on one lock, so attaching to a persisted generation can never
//! race a rebuild that is about to drop it.
//!
//! Every embedding call is bounded by the configured embedding timeout.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::config::{EmbeddingConfig, IndexConfig};
use crate::document::{Document, MetadataFilter};
use crate::error::{Error, Result};
use crate::loader::{build_exercise_documents, build_food_documents};
use crate::rag::{bounded, Embeddings, ScoredDocument, SourceStore, VectorRecord, VectorStore};

/// Collection metadata key holding the embedding model a generation was built with
pub const META_EMBEDDING_MODEL: &str = "embedding_model";
/// Collection metadata key holding the build timestamp (RFC 3339)
pub const META_BUILT_AT: &str = "built_at";
/// Collection metadata key holding the number of documents embedded
pub const META_DOCUMENTS: &str = "documents";

const GENERATION_SEPARATOR: &str = "__";

/// The generation currently serving queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveIndex {
    /// Concrete collection name
    pub collection: String,
    /// When this process swapped it in, or its build time when loaded
    pub last_indexed_at: DateTime<Utc>,
}

/// Point-in-time view of the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStatus {
    /// Whether a collection exists in the store
    pub exists: bool,
    /// Vectors in that collection
    pub vector_count: usize,
    /// Last successful build or load in this process
    pub last_indexed_at: Option<DateTime<Utc>>,
    /// Concrete collection name, if any
    pub collection: Option<String>,
    /// Embedding model in use
    pub embedding_model: String,
}

/// Outcome of a completed rebuild
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildReport {
    /// Generation now serving
    pub collection: String,
    /// Documents embedded
    pub documents: usize,
    /// Batches sent to the embedding provider
    pub batches: usize,
    /// When the new generation went live
    pub indexed_at: DateTime<Utc>,
    /// Wall time spent
    pub duration_ms: u64,
}

/// Builds, loads and swaps the vector index
pub struct IndexManager {
    store: Arc<dyn VectorStore>,
    source: Arc<dyn SourceStore>,
    embeddings: Arc<dyn Embeddings>,
    settings: IndexConfig,
    embed_timeout: Duration,
    active: RwLock<Option<ActiveIndex>>,
    rebuild_lock: Mutex<()>,
}

impl IndexManager {
    /// Create a manager; nothing is loaded until [`initialize`](Self::initialize)
    pub fn new(
        store: Arc<dyn VectorStore>,
        source: Arc<dyn SourceStore>,
        embeddings: Arc<dyn Embeddings>,
        settings: IndexConfig,
    ) -> Self {
        Self {
            store,
            source,
            embeddings,
            settings,
            embed_timeout: EmbeddingConfig::default().request_timeout(),
            active: RwLock::new(None),
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Bound every embedding call by `timeout`
    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    /// Upper bound on one embedding call
    pub fn embed_timeout(&self) -> Duration {
        self.embed_timeout
    }

    /// Logical collection name
    pub fn name(&self) -> &str {
        &self.settings.collection
    }

    /// Load a persisted collection if a usable one exists, otherwise rebuild.
    ///
    /// A failing existence probe is treated as "absent".
    #[instrument(skip(self), fields(collection = %self.settings.collection))]
    pub async fn initialize(&self) -> Result<IndexStatus> {
        let guard = self.rebuild_lock.lock().await;
        match self.attach().await {
            Ok(active) => {
                info!(collection = %active.collection, "loaded existing vector index");
            }
            Err(e) => {
                info!(reason = %e, "no usable vector index, building from source");
                self.rebuild_locked().await?;
            }
        }
        drop(guard);
        self.status().await
    }

    /// Reattach to the persisted collection, rebuilding if it is missing or unusable
    pub async fn load(&self) -> Result<IndexStatus> {
        let guard = self.rebuild_lock.lock().await;
        if let Err(e) = self.attach().await {
            warn!(error = %e, "persisted vector index unusable, rebuilding");
            self.rebuild_locked().await?;
        }
        drop(guard);
        self.status().await
    }

    /// Whether a generation is serving queries
    pub async fn is_ready(&self) -> bool {
        self.active.read().await.is_some()
    }

    /// The serving generation, or `EngineNotReady`
    pub async fn active(&self) -> Result<ActiveIndex> {
        self.active
            .read()
            .await
            .clone()
            .ok_or_else(not_ready)
    }

    /// Caller holds `rebuild_lock`
    async fn attach(&self) -> Result<ActiveIndex> {
        let target = self
            .store
            .resolve_alias(self.name())
            .await?
            .unwrap_or_else(|| self.name().to_string());

        let info = self
            .store
            .get_collection(&target)
            .await?
            .ok_or_else(|| Error::store(format!("collection not found: {target}")))?;

        if info.count == 0 {
            return Err(Error::store(format!("collection is empty: {target}")));
        }
        match info.metadata.get(META_EMBEDDING_MODEL) {
            Some(model) if model == self.embeddings.model() => {}
            Some(model) => {
                return Err(Error::store(format!(
                    "collection {target} was built with {model}, expected {}",
                    self.embeddings.model()
                )));
            }
            None => {
                return Err(Error::store(format!(
                    "collection {target} has no embedding model metadata"
                )));
            }
        }

        let last_indexed_at = info
            .metadata
            .get(META_BUILT_AT)
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let active = ActiveIndex {
            collection: target,
            last_indexed_at,
        };
        *self.active.write().await = Some(active.clone());
        Ok(active)
    }

    /// Rebuild the index from a fresh snapshot of the source store.
    ///
    /// Blocks for as long as embedding takes. At most one rebuild runs at a
    /// time; a second caller waits and then rebuilds again from its own
    /// snapshot.
    #[instrument(skip(self), fields(collection = %self.settings.collection))]
    pub async fn rebuild(&self) -> Result<RebuildReport> {
        let _guard = self.rebuild_lock.lock().await;
        self.rebuild_locked().await
    }

    /// Caller holds `rebuild_lock`
    async fn rebuild_locked(&self) -> Result<RebuildReport> {
        let started = Instant::now();

        let documents = self.snapshot().await?;
        if documents.is_empty() {
            warn!("source store returned no rows, index will be empty");
        }

        let generation = format!(
            "{}{}{}",
            self.name(),
            GENERATION_SEPARATOR,
            uuid::Uuid::new_v4().simple()
        );
        let built_at = Utc::now();

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "description".to_string(),
            "Exercise and food item embeddings".to_string(),
        );
        metadata.insert(
            META_EMBEDDING_MODEL.to_string(),
            self.embeddings.model().to_string(),
        );
        metadata.insert(META_BUILT_AT.to_string(), built_at.to_rfc3339());
        metadata.insert(META_DOCUMENTS.to_string(), documents.len().to_string());

        self.store.create_collection(&generation, metadata).await?;
        debug!(%generation, "created staging collection");

        let batches = match self.embed_into(&generation, &documents).await {
            Ok(batches) => batches,
            Err(e) => {
                self.discard(&generation).await;
                return Err(e);
            }
        };

        let (previous, indexed_at) = match self.swap(&generation).await {
            Ok(swapped) => swapped,
            Err(e) => {
                self.discard(&generation).await;
                return Err(e);
            }
        };
        for old in previous {
            self.discard(&old).await;
        }

        let report = RebuildReport {
            collection: generation,
            documents: documents.len(),
            batches,
            indexed_at,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            generation = %report.collection,
            documents = report.documents,
            batches = report.batches,
            duration_ms = report.duration_ms,
            "vector index rebuilt"
        );
        Ok(report)
    }

    async fn snapshot(&self) -> Result<Vec<Document>> {
        let (exercises, food_items) =
            tokio::try_join!(self.source.exercises(), self.source.food_items())?;

        let mut documents = build_exercise_documents(&exercises);
        documents.extend(build_food_documents(&food_items));
        info!(
            exercises = exercises.len(),
            food_items = food_items.len(),
            "loaded source snapshot"
        );
        Ok(documents)
    }

    async fn embed_into(&self, collection: &str, documents: &[Document]) -> Result<usize> {
        let batch_size = self.settings.embed_batch_size.max(1);
        let total_batches = documents.len().div_ceil(batch_size);

        for (i, batch) in documents.chunks(batch_size).enumerate() {
            let batch_no = i + 1;
            let tag = |source: Error| Error::EmbeddingBatch {
                batch: batch_no,
                total_batches,
                source: Box::new(source),
            };

            let mut records = Vec::with_capacity(batch.len());
            for document in batch {
                let embedding = bounded(self.embed_timeout, self.embeddings.embed(&document.text))
                    .await
                    .map_err(tag)?;
                records.push(VectorRecord::from_document(document, embedding));
            }
            self.store.upsert(collection, records).await.map_err(tag)?;
            debug!(batch = batch_no, total_batches, "embedded batch");

            if batch_no < total_batches && !self.settings.batch_pause().is_zero() {
                tokio::time::sleep(self.settings.batch_pause()).await;
            }
        }
        Ok(total_batches)
    }

    /// Point the alias and the handle at `generation`; returns collections to
    /// drop and the swap time
    async fn swap(&self, generation: &str) -> Result<(Vec<String>, DateTime<Utc>)> {
        let mut active = self.active.write().await;

        let persisted = self.store.resolve_alias(self.name()).await?;
        self.store.set_alias(self.name(), generation).await?;

        let indexed_at = Utc::now();
        let previous = active.replace(ActiveIndex {
            collection: generation.to_string(),
            last_indexed_at: indexed_at,
        });
        drop(active);

        let mut stale: Vec<String> = previous
            .map(|p| p.collection)
            .into_iter()
            .chain(persisted)
            .chain(std::iter::once(self.name().to_string()))
            .filter(|c| c != generation)
            .collect();
        stale.sort();
        stale.dedup();
        Ok((stale, indexed_at))
    }

    async fn discard(&self, collection: &str) {
        match self.store.delete_collection(collection).await {
            Ok(true) => debug!(%collection, "dropped collection"),
            Ok(false) => {}
            Err(e) => warn!(%collection, error = %e, "failed to drop collection"),
        }
    }

    /// Similarity query against the serving generation.
    ///
    /// Holds the read side of the active-index lock for the duration of the
    /// store query, so a swap waits for it.
    pub async fn query(
        &self,
        embedding: &[f32],
        filter: &MetadataFilter,
        k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let active = self.active.read().await;
        let current = active.as_ref().ok_or_else(not_ready)?;
        self.store
            .query(&current.collection, embedding, filter, k)
            .await
    }

    /// Current index status
    pub async fn status(&self) -> Result<IndexStatus> {
        let active = self.active.read().await.clone();
        let collection = match &active {
            Some(a) => Some(a.collection.clone()),
            None => self.store.resolve_alias(self.name()).await?,
        };
        let info = match &collection {
            Some(name) => self.store.get_collection(name).await?,
            None => self.store.get_collection(self.name()).await?,
        };

        Ok(IndexStatus {
            exists: info.is_some(),
            vector_count: info.as_ref().map_or(0, |i| i.count),
            last_indexed_at: active.map(|a| a.last_indexed_at),
            collection: info.map(|i| i.name),
            embedding_model: self.embeddings.model().to_string(),
        })
    }
}

fn not_ready() -> Error {
    Error::EngineNotReady("vector index is not initialized".into())
}
