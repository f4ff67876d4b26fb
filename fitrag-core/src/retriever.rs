//! Retriever
//!
//! Metadata-filtered similarity search over the serving index, plus the query
//! strings and context assembly used by plan generation.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::document::{Document, MetadataFilter, SourceKind};
use crate::error::Result;
use crate::index::IndexManager;
use crate::preferences::{DietaryPreference, UserPreferences};
use crate::rag::{bounded, Embeddings, ScoredDocument};

/// Separator between documents in a retrieval context
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Documents retrieved for one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    /// Query text
    pub query: String,
    /// Domain searched
    pub source: SourceKind,
    /// Matches, most similar first
    #[serde(skip)]
    pub hits: Vec<ScoredDocument>,
}

impl RetrievalResult {
    /// Number of documents retrieved
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether nothing was retrieved
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Retrieved documents in rank order
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.hits.iter().map(|h| &h.document)
    }

    /// Document texts joined by a blank line, for prompt insertion
    pub fn context(&self) -> String {
        self.documents()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }
}

/// Similarity search restricted to one source domain
#[derive(Clone)]
pub struct Retriever {
    index: Arc<IndexManager>,
    embeddings: Arc<dyn Embeddings>,
    embed_timeout: Duration,
}

impl Retriever {
    /// Create a retriever over `index`, sharing its embedding timeout
    pub fn new(index: Arc<IndexManager>, embeddings: Arc<dyn Embeddings>) -> Self {
        let embed_timeout = index.embed_timeout();
        Self {
            index,
            embeddings,
            embed_timeout,
        }
    }

    /// Bound query embedding by `timeout`
    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    /// Up to `k` documents from `source`, most similar to `query` first.
    ///
    /// Fails with `EngineNotReady` before the index is initialized.
    pub async fn retrieve(
        &self,
        query: &str,
        source: SourceKind,
        k: usize,
    ) -> Result<RetrievalResult> {
        self.index.active().await?;

        let mut result = RetrievalResult {
            query: query.to_string(),
            source,
            hits: Vec::new(),
        };
        if k == 0 {
            return Ok(result);
        }

        let embedding = bounded(self.embed_timeout, self.embeddings.embed_query(query)).await?;
        let hits = self
            .index
            .query(&embedding, &MetadataFilter::source(source), k)
            .await?;

        let returned = hits.len();
        result.hits = hits
            .into_iter()
            .filter(|h| h.document.source() == Some(source))
            .take(k)
            .collect();
        if result.hits.len() < returned.min(k) {
            warn!(
                %source,
                dropped = returned - result.hits.len(),
                "vector store returned documents outside the requested source"
            );
        }

        debug!(%source, k, hits = result.hits.len(), "retrieved documents");
        Ok(result)
    }
}

/// Retrieval query for a workout plan
pub fn workout_query(preferences: &UserPreferences) -> String {
    let mut parts = Vec::new();
    if !preferences.target_muscle_groups.is_empty() {
        parts.push(format!(
            "muscle groups: {}",
            preferences.target_muscle_groups.join(", ")
        ));
    }
    if !preferences.equipment_list.is_empty() {
        parts.push(format!("equipment: {}", preferences.equipment_list.join(", ")));
    }
    parts.push(format!("difficulty: {}", preferences.experience_level));
    format!("exercises for {}", parts.join(", "))
}

/// Retrieval query for a diet plan
pub fn diet_query(preferences: &UserPreferences) -> String {
    match preferences.dietary_preference {
        DietaryPreference::Veg => "Pakistani food items vegetarian".to_string(),
        DietaryPreference::NonVeg => "Pakistani food items meat protein".to_string(),
        DietaryPreference::Mixed => "Pakistani food items".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{ExperienceLevel, Gender, Goal, WorkoutLocation};

    fn prefs() -> UserPreferences {
        UserPreferences::new(30, 80.0, 180.0, Gender::Male, Goal::Strength, WorkoutLocation::Gym)
    }

    #[test]
    fn test_workout_query_parts() {
        assert_eq!(workout_query(&prefs()), "exercises for difficulty: beginner");

        let mut p = prefs();
        p.target_muscle_groups = vec!["chest".into(), "back".into()];
        p.equipment_list = vec!["barbell".into()];
        p.experience_level = ExperienceLevel::Advanced;
        assert_eq!(
            workout_query(&p),
            "exercises for muscle groups: chest, back, equipment: barbell, difficulty: advanced"
        );
    }

    #[test]
    fn test_diet_query_follows_preference() {
        let mut p = prefs();
        assert_eq!(diet_query(&p), "Pakistani food items");
        p.dietary_preference = DietaryPreference::Veg;
        assert!(diet_query(&p).ends_with("vegetarian"));
        p.dietary_preference = DietaryPreference::NonVeg;
        assert!(diet_query(&p).ends_with("meat protein"));
    }

    #[test]
    fn test_context_joins_with_blank_line() {
        let doc = |id, text: &str| ScoredDocument {
            document: Document::new(SourceKind::FoodItem, id, text.to_string(), Default::default()),
            score: 1.0,
        };
        let result = RetrievalResult {
            query: "q".into(),
            source: SourceKind::FoodItem,
            hits: vec![doc(1, "Roti"), doc(2, "Daal")],
        };
        assert_eq!(result.context(), "Roti\n\nDaal");
        assert_eq!(result.len(), 2);
    }
}
