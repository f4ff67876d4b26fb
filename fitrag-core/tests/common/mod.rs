#![allow(dead_code)]

use std::sync::Arc;

use fitrag_core::config::{EngineConfig, IndexConfig};
use fitrag_core::loader::{ExerciseRecord, FoodItemRecord};
use fitrag_core::mock::{HashEmbeddings, ScriptedCompletion};
use fitrag_core::plan::{DietPlan, PlanSchema, WorkoutPlan};
use fitrag_core::prelude::*;
use fitrag_core::store::{MemorySourceStore, MemoryVectorStore};

pub const DIMENSION: usize = 128;

pub fn exercise(id: i64, name: &str, muscle_group: &str) -> ExerciseRecord {
    ExerciseRecord {
        id,
        name: name.to_string(),
        muscle_group: muscle_group.to_string(),
        difficulty: "beginner".to_string(),
        equipment_required: Some(r#"["none"]"#.to_string()),
        description: Some(format!("{name} for {muscle_group}")),
        video_url: None,
    }
}

pub fn food(id: i64, name: &str, is_veg: bool) -> FoodItemRecord {
    FoodItemRecord {
        id,
        name: name.to_string(),
        category: if is_veg { "lentils" } else { "meat" }.to_string(),
        calories_per_100g: 150.0,
        protein_per_100g: 10.0,
        carbs_per_100g: 20.0,
        fats_per_100g: 5.0,
        vitamins: None,
        minerals: None,
        serving_description: Some("1 bowl".to_string()),
        is_veg,
        description: None,
    }
}

pub fn exercises() -> Vec<ExerciseRecord> {
    vec![
        exercise(1, "Push Ups", "chest"),
        exercise(2, "Bench Press", "chest"),
        exercise(3, "Pull Ups", "back"),
        exercise(4, "Squats", "legs"),
        exercise(5, "Plank", "core"),
    ]
}

pub fn foods() -> Vec<FoodItemRecord> {
    vec![
        food(1, "Daal Chana", true),
        food(2, "Chicken Karahi", false),
        food(3, "Roti", true),
    ]
}

pub fn source() -> Arc<MemorySourceStore> {
    Arc::new(MemorySourceStore::new(exercises(), foods()))
}

pub fn index_config(batch: usize) -> IndexConfig {
    IndexConfig {
        embed_batch_size: batch,
        batch_pause_ms: 0,
        ..Default::default()
    }
}

pub fn engine_config() -> EngineConfig {
    EngineConfig {
        index: index_config(2),
        ..Default::default()
    }
}

pub fn workout_json() -> String {
    serde_json::to_string_pretty(&WorkoutPlan::example()).unwrap()
}

pub fn diet_json() -> String {
    serde_json::to_string_pretty(&DietPlan::example()).unwrap()
}

pub struct Harness {
    pub engine: PlanEngine,
    pub store: Arc<MemoryVectorStore>,
    pub source: Arc<MemorySourceStore>,
    pub embeddings: Arc<HashEmbeddings>,
    pub completion: Arc<ScriptedCompletion>,
}

pub fn harness(completion: ScriptedCompletion) -> Harness {
    let store = Arc::new(MemoryVectorStore::new());
    let source = source();
    let embeddings = Arc::new(HashEmbeddings::new(DIMENSION));
    let completion = Arc::new(completion);
    let engine = PlanEngine::new(
        engine_config(),
        store.clone(),
        source.clone(),
        embeddings.clone(),
        completion.clone(),
    )
    .unwrap();
    Harness {
        engine,
        store,
        source,
        embeddings,
        completion,
    }
}

pub fn preferences() -> UserPreferences {
    UserPreferences::new(25, 70.0, 170.0, Gender::Male, Goal::Maintain, WorkoutLocation::Gym)
}
