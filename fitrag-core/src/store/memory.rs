//! In-memory stores
//!
//! Brute-force vector search over collections kept in a map. Used by tests and
//! for running the engine without a database.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{cosine_similarity, rank};
use crate::document::{Document, MetadataFilter};
use crate::error::{Error, Result};
use crate::loader::{ExerciseRecord, FoodItemRecord};
use crate::rag::{CollectionInfo, ScoredDocument, SourceStore, VectorRecord, VectorStore};

#[derive(Debug, Default)]
struct Collection {
    metadata: BTreeMap<String, String>,
    records: BTreeMap<String, VectorRecord>,
}

#[derive(Debug, Default)]
struct State {
    collections: BTreeMap<String, Collection>,
    aliases: BTreeMap<String, String>,
    peak_collections: usize,
}

/// A vector store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    state: RwLock<State>,
}

impl MemoryVectorStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all collections currently present
    pub fn collection_names(&self) -> Vec<String> {
        self.state.read().collections.keys().cloned().collect()
    }

    /// Most collections that ever existed at the same time
    pub fn peak_collection_count(&self) -> usize {
        self.state.read().peak_collections
    }

    /// Ids stored in `collection`, sorted
    pub fn ids(&self, collection: &str) -> Result<Vec<String>> {
        let state = self.state.read();
        let coll = state
            .collections
            .get(collection)
            .ok_or_else(|| missing(collection))?;
        Ok(coll.records.keys().cloned().collect())
    }
}

fn missing(name: &str) -> Error {
    Error::store(format!("collection not found: {name}"))
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn create_collection(
        &self,
        name: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<()> {
        let mut state = self.state.write();
        if state.collections.contains_key(name) {
            return Err(Error::store(format!("collection already exists: {name}")));
        }
        state.collections.insert(
            name.to_string(),
            Collection {
                metadata,
                records: BTreeMap::new(),
            },
        );
        state.peak_collections = state.peak_collections.max(state.collections.len());
        Ok(())
    }

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let state = self.state.read();
        Ok(state.collections.get(name).map(|c| CollectionInfo {
            name: name.to_string(),
            metadata: c.metadata.clone(),
            count: c.records.len(),
        }))
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        Ok(self.state.write().collections.remove(name).is_some())
    }

    async fn count(&self, name: &str) -> Result<usize> {
        let state = self.state.read();
        state
            .collections
            .get(name)
            .map(|c| c.records.len())
            .ok_or_else(|| missing(name))
    }

    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> Result<()> {
        let mut state = self.state.write();
        let coll = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        for record in records {
            coll.records.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        filter: &MetadataFilter,
        k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let state = self.state.read();
        let coll = state
            .collections
            .get(collection)
            .ok_or_else(|| missing(collection))?;

        let scored = coll
            .records
            .values()
            .filter(|r| filter.matches(&r.metadata))
            .map(|r| ScoredDocument {
                document: Document {
                    id: r.id.clone(),
                    text: r.text.clone(),
                    metadata: r.metadata.clone(),
                },
                score: cosine_similarity(embedding, &r.embedding),
            })
            .collect();

        Ok(rank(scored, k))
    }

    async fn set_alias(&self, alias: &str, collection: &str) -> Result<()> {
        let mut state = self.state.write();
        if !state.collections.contains_key(collection) {
            return Err(missing(collection));
        }
        state
            .aliases
            .insert(alias.to_string(), collection.to_string());
        Ok(())
    }

    async fn resolve_alias(&self, alias: &str) -> Result<Option<String>> {
        Ok(self.state.read().aliases.get(alias).cloned())
    }
}

/// A source store over fixed record lists
#[derive(Debug, Default)]
pub struct MemorySourceStore {
    exercises: RwLock<Vec<ExerciseRecord>>,
    food_items: RwLock<Vec<FoodItemRecord>>,
}

impl MemorySourceStore {
    /// Create a store holding the given rows
    pub fn new(exercises: Vec<ExerciseRecord>, food_items: Vec<FoodItemRecord>) -> Self {
        let store = Self::default();
        store.set_exercises(exercises);
        store.set_food_items(food_items);
        store
    }

    /// Replace the exercise rows
    pub fn set_exercises(&self, mut rows: Vec<ExerciseRecord>) {
        rows.sort_by_key(|r| r.id);
        *self.exercises.write() = rows;
    }

    /// Replace the food item rows
    pub fn set_food_items(&self, mut rows: Vec<FoodItemRecord>) {
        rows.sort_by_key(|r| r.id);
        *self.food_items.write() = rows;
    }
}

#[async_trait]
impl SourceStore for MemorySourceStore {
    async fn exercises(&self) -> Result<Vec<ExerciseRecord>> {
        Ok(self.exercises.read().clone())
    }

    async fn food_items(&self) -> Result<Vec<FoodItemRecord>> {
        Ok(self.food_items.read().clone())
    }
}
