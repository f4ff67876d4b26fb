//! Plan engine
//!
//! The caller-facing surface: an explicitly constructed engine that owns the
//! index manager, retriever and generator. Build one at startup, call
//! [`PlanEngine::initialize`], then share it (e.g. behind an `Arc`) across
//! request handlers. Requests share no mutable state besides the index.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::EngineConfig;
use crate::document::SourceKind;
use crate::error::Result;
use crate::generation::Generator;
use crate::index::{IndexManager, IndexStatus, RebuildReport};
use crate::nutrition::{macros_for, MacroTargets};
use crate::plan::{DietPlan, WorkoutPlan};
use crate::preferences::UserPreferences;
use crate::prompts::{compile_diet_prompt, compile_workout_prompt};
use crate::rag::{Completion, Embeddings, SourceStore, VectorStore};
use crate::retriever::{diet_query, workout_query, Retriever};

/// Workout and diet plans generated together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanBundle {
    /// Workout plan
    pub workout_plan: WorkoutPlan,
    /// Diet plan
    pub diet_plan: DietPlan,
    /// Generation details
    pub metadata: PlanMetadata,
}

/// Details about how a bundle was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    /// Caller's user id
    pub user_id: i64,
    /// Macro targets the diet plan was built around
    pub macro_targets: MacroTargets,
    /// Wall time for both plans
    pub duration_ms: u64,
    /// Completion time
    pub generated_at: DateTime<Utc>,
    /// Completion model
    pub llm_model: String,
    /// Embedding model
    pub embedding_model: String,
}

/// Result of a reindex request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReindexReport {
    /// Always `"success"`; failures are returned as errors
    pub status: String,
    /// When the new index went live
    pub indexed_at: DateTime<Utc>,
    /// Documents in the new index
    pub documents: usize,
    /// Human-readable summary
    pub message: String,
}

/// Source store reachability and row counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseStatus {
    /// Whether the source store answered
    pub connected: bool,
    /// Exercise rows
    pub exercises: Option<usize>,
    /// Food item rows
    pub food_items: Option<usize>,
    /// Error text when not connected
    pub error: Option<String>,
}

/// Engine health report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Index serving and source store reachable
    pub healthy: bool,
    /// Vector index status, if the vector store answered
    pub index: Option<IndexStatus>,
    /// Vector store error text, if it did not
    pub index_error: Option<String>,
    /// Source store status
    pub database: DatabaseStatus,
    /// Completion model
    pub llm_model: String,
    /// When this report was taken
    pub checked_at: DateTime<Utc>,
}

/// The RAG plan generation engine
pub struct PlanEngine {
    config: EngineConfig,
    index: Arc<IndexManager>,
    retriever: Retriever,
    generator: Generator,
    source: Arc<dyn SourceStore>,
    embeddings: Arc<dyn Embeddings>,
}

impl PlanEngine {
    /// Wire an engine from its capabilities. Nothing touches the network
    /// until [`initialize`](Self::initialize).
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn VectorStore>,
        source: Arc<dyn SourceStore>,
        embeddings: Arc<dyn Embeddings>,
        completion: Arc<dyn Completion>,
    ) -> Result<Self> {
        config.validate()?;

        let index = Arc::new(
            IndexManager::new(store, source.clone(), embeddings.clone(), config.index.clone())
                .with_embed_timeout(config.embedding.request_timeout()),
        );
        let retriever = Retriever::new(index.clone(), embeddings.clone());
        let generator = Generator::new(completion, config.generation.clone());

        Ok(Self {
            config,
            index,
            retriever,
            generator,
            source,
            embeddings,
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Index manager
    pub fn index(&self) -> &Arc<IndexManager> {
        &self.index
    }

    /// Retriever over the serving index
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Load or build the vector index
    pub async fn initialize(&self) -> Result<IndexStatus> {
        self.index.initialize().await
    }

    /// Generate a workout plan
    #[instrument(skip_all, fields(goal = %preferences.goal, weeks = preferences.duration_weeks))]
    pub async fn generate_workout_plan(&self, preferences: &UserPreferences) -> Result<WorkoutPlan> {
        preferences.validate()?;
        self.index.active().await?;

        let retrieval = self
            .retriever
            .retrieve(
                &workout_query(preferences),
                SourceKind::Exercise,
                self.config.retrieval.exercise_top_k,
            )
            .await?;
        let prompt = compile_workout_prompt(preferences, &retrieval.context())?;
        let plan: WorkoutPlan = self.generator.generate_structured(&prompt).await?;

        info!(
            exercises_retrieved = retrieval.len(),
            prescriptions = plan.exercise_count(),
            "workout plan generated"
        );
        Ok(plan)
    }

    /// Generate a diet plan
    #[instrument(skip_all, fields(goal = %preferences.goal, diet = %preferences.dietary_preference))]
    pub async fn generate_diet_plan(&self, preferences: &UserPreferences) -> Result<DietPlan> {
        preferences.validate()?;
        self.index.active().await?;
        self.diet_plan_with(preferences, &macros_for(preferences)).await
    }

    async fn diet_plan_with(
        &self,
        preferences: &UserPreferences,
        macros: &MacroTargets,
    ) -> Result<DietPlan> {
        let retrieval = self
            .retriever
            .retrieve(
                &diet_query(preferences),
                SourceKind::FoodItem,
                self.config.retrieval.food_top_k,
            )
            .await?;
        let prompt = compile_diet_prompt(preferences, &retrieval.context(), macros)?;
        let plan: DietPlan = self.generator.generate_structured(&prompt).await?;

        info!(
            foods_retrieved = retrieval.len(),
            meals = plan.meals.len(),
            "diet plan generated"
        );
        Ok(plan)
    }

    /// Generate both plans concurrently
    #[instrument(skip(self, preferences))]
    pub async fn generate_plan(
        &self,
        user_id: i64,
        preferences: &UserPreferences,
    ) -> Result<PlanBundle> {
        preferences.validate()?;
        self.index.active().await?;

        let started = Instant::now();
        let macros = macros_for(preferences);
        let (workout_plan, diet_plan) = tokio::try_join!(
            self.generate_workout_plan(preferences),
            self.diet_plan_with(preferences, &macros),
        )?;

        let metadata = PlanMetadata {
            user_id,
            macro_targets: macros,
            duration_ms: started.elapsed().as_millis() as u64,
            generated_at: Utc::now(),
            llm_model: self.generator.model().to_string(),
            embedding_model: self.embeddings.model().to_string(),
        };
        info!(user_id, duration_ms = metadata.duration_ms, "plan bundle generated");

        Ok(PlanBundle {
            workout_plan,
            diet_plan,
            metadata,
        })
    }

    /// Rebuild the index.
    ///
    /// `tables` names the source tables the caller wants refreshed
    /// (`exercise`, `food_item`). The index is one snapshot across both, so
    /// any request rebuilds everything; unknown names are rejected.
    pub async fn reindex(&self, tables: Option<&[String]>) -> Result<ReindexReport> {
        let requested: Vec<SourceKind> = match tables {
            Some(names) => names
                .iter()
                .map(|name| name.parse())
                .collect::<Result<_>>()?,
            None => SourceKind::ALL.to_vec(),
        };
        info!(?requested, "reindex requested");

        let RebuildReport {
            documents,
            indexed_at,
            duration_ms,
            ..
        } = self.index.rebuild().await?;

        Ok(ReindexReport {
            status: "success".to_string(),
            indexed_at,
            documents,
            message: format!("Indexed {documents} documents in {duration_ms} ms"),
        })
    }

    /// Health of the index and the source store
    pub async fn status(&self) -> EngineStatus {
        let (index, counts) = futures::join!(self.index.status(), self.source.counts());

        let (index, index_error) = match index {
            Ok(status) => (Some(status), None),
            Err(e) => {
                warn!(error = %e, "vector store status check failed");
                (None, Some(e.to_string()))
            }
        };
        let database = match counts {
            Ok(counts) => DatabaseStatus {
                connected: true,
                exercises: Some(counts.exercises),
                food_items: Some(counts.food_items),
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "source store status check failed");
                DatabaseStatus {
                    connected: false,
                    exercises: None,
                    food_items: None,
                    error: Some(e.to_string()),
                }
            }
        };

        let serving = index
            .as_ref()
            .is_some_and(|s| s.exists && s.last_indexed_at.is_some());

        EngineStatus {
            healthy: serving && database.connected,
            index,
            index_error,
            database,
            llm_model: self.generator.model().to_string(),
            checked_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for PlanEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanEngine")
            .field("collection", &self.index.name())
            .field("llm_model", &self.generator.model())
            .field("embedding_model", &self.embeddings.model())
            .finish()
    }
}

