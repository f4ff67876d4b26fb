//! # fitrag Core - Retrieval-augmented fitness plans
//!
//! Core types, traits, and the generation pipeline for fitrag.
//!
//! This crate provides:
//! - Documents (`document`, `loader`) - Source rows rendered for embedding
//! - Capability traits (`rag`) - Embeddings, completion, vector and source stores
//! - Vector index (`index`) - Build, load and swap the shared collection
//! - Retrieval (`retriever`) - Source-filtered similarity search
//! - Nutrition (`nutrition`) - Deterministic macro targets
//! - Plans (`plan`, `schema`) - Plan types and structural validation
//! - Prompts (`prompts`) - Deterministic prompt compilation
//! - Generation (`generation`, `extraction`) - Invoke, unwrap, parse, validate
//! - Engine (`engine`) - The caller-facing operations

#![warn(missing_docs)]

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod extraction;
pub mod generation;
pub mod index;
pub mod loader;
pub mod logging;
pub mod mock;
pub mod nutrition;
pub mod plan;
pub mod preferences;
pub mod prompts;
pub mod rag;
pub mod retriever;
pub mod schema;
pub mod store;

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::document::{Document, MetadataFilter, MetadataValue, SourceKind};
    pub use crate::engine::{EngineStatus, PlanBundle, PlanEngine, ReindexReport};
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::index::{IndexManager, IndexStatus};
    pub use crate::loader::{ExerciseRecord, FoodItemRecord};
    pub use crate::nutrition::{compute_macros, MacroTargets};
    pub use crate::plan::{DietPlan, PlanSchema, WorkoutPlan};
    pub use crate::preferences::{
        DietaryPreference, ExperienceLevel, Gender, Goal, UserPreferences, WorkoutLocation,
    };
    pub use crate::rag::{Completion, CompletionRequest, Embeddings, SourceStore, VectorStore};
    pub use crate::retriever::{RetrievalResult, Retriever};
}
