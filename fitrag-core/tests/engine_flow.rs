mod common;

use fitrag_core::mock::ScriptedCompletion;
use fitrag_core::prelude::*;
use serde_json::json;

use common::*;

const WORKOUT_NEEDLE: &str = "workout plan for";
const DIET_NEEDLE: &str = "Pakistani diet plan";

fn scripted() -> ScriptedCompletion {
    ScriptedCompletion::new()
        .when_prompt_contains(WORKOUT_NEEDLE, format!("```json\n{}\n```", workout_json()))
        .when_prompt_contains(DIET_NEEDLE, diet_json())
}

#[tokio::test]
async fn test_operations_before_initialize_are_not_ready() {
    let h = harness(scripted());

    let err = h.engine.generate_workout_plan(&preferences()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineNotReady);
    let err = h.engine.generate_plan(7, &preferences()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineNotReady);
    assert!(h.completion.requests().is_empty());

    let status = h.engine.status().await;
    assert!(!status.healthy);
    assert!(status.database.connected);
    assert_eq!(status.database.exercises, Some(5));
}

#[tokio::test]
async fn test_generate_plan_bundle() {
    let h = harness(scripted());
    h.engine.initialize().await.unwrap();

    let mut prefs = preferences();
    prefs.target_muscle_groups = vec!["chest".into()];
    let bundle = h.engine.generate_plan(42, &prefs).await.unwrap();

    assert_eq!(bundle.workout_plan, WorkoutPlan::example());
    assert_eq!(bundle.diet_plan, DietPlan::example());
    assert_eq!(bundle.metadata.user_id, 42);
    assert_eq!(bundle.metadata.macro_targets.calories, 2545);
    assert_eq!(bundle.metadata.llm_model, "mock-completion");
    assert_eq!(bundle.metadata.embedding_model, "mock-hash-embedding");

    let requests = h.completion.requests();
    assert_eq!(requests.len(), 2);
    let workout = requests.iter().find(|r| r.prompt.contains(WORKOUT_NEEDLE)).unwrap();
    let diet = requests.iter().find(|r| r.prompt.contains(DIET_NEEDLE)).unwrap();

    assert!(workout.prompt.contains("Push Ups | chest"));
    assert!(!workout.prompt.contains("Food Item:"));
    assert!(diet.prompt.contains("Food Item: Daal Chana"));
    assert!(!diet.prompt.contains("| chest |"));
    assert!(diet.prompt.contains("TARGETS: 2545kcal, 112g protein, 366g carbs, 70g fats"));
    assert_eq!(workout.temperature, Some(0.7));
}

#[tokio::test]
async fn test_veg_diet_query_and_prompt() {
    let h = harness(scripted());
    h.engine.initialize().await.unwrap();

    let mut prefs = preferences();
    prefs.dietary_preference = DietaryPreference::Veg;
    prefs.excluded_foods = vec!["Roti".into()];
    h.engine.generate_diet_plan(&prefs).await.unwrap();

    let requests = h.completion.requests();
    let prompt = &requests[0].prompt;
    assert!(prompt.contains("PREFERENCE: veg"));
    assert!(prompt.contains("AVOID: Roti."));
}

#[tokio::test]
async fn test_out_of_range_sets_is_schema_violation() {
    let completion = ScriptedCompletion::new();
    let mut plan = serde_json::to_value(WorkoutPlan::example()).unwrap();
    plan["weeks"][0]["days"][0]["exercises"][0]["sets"] = json!(15);
    completion.push_response(plan.to_string());

    let h = harness(completion);
    h.engine.initialize().await.unwrap();
    let err = h.engine.generate_workout_plan(&preferences()).await.unwrap_err();

    match err {
        Error::SchemaViolation { field, .. } => {
            assert_eq!(field, "weeks[0].days[0].exercises[0].sets");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_daily_totals_is_schema_violation() {
    let completion = ScriptedCompletion::new();
    let mut plan = serde_json::to_value(DietPlan::example()).unwrap();
    plan.as_object_mut().unwrap().remove("daily_totals");
    completion.push_response(format!("Sure!\n```json\n{plan}\n```"));

    let h = harness(completion);
    h.engine.initialize().await.unwrap();
    let err = h.engine.generate_diet_plan(&preferences()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    assert!(err.to_string().contains("daily_totals"));
}

#[tokio::test]
async fn test_unterminated_fence_is_malformed_output() {
    let completion = ScriptedCompletion::new();
    completion.push_response(format!("```json\n{}", workout_json()));

    let h = harness(completion);
    h.engine.initialize().await.unwrap();
    let err = h.engine.generate_workout_plan(&preferences()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedOutput);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_provider_failure_is_connectivity() {
    let completion = ScriptedCompletion::new();
    completion.push_error(Error::ProviderRateLimit { retry_after_secs: 60 });

    let h = harness(completion);
    h.engine.initialize().await.unwrap();
    let err = h.engine.generate_workout_plan(&preferences()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_invalid_preferences_rejected_before_any_call() {
    let h = harness(scripted());
    h.engine.initialize().await.unwrap();

    let mut prefs = preferences();
    prefs.age = 5;
    let err = h.engine.generate_plan(1, &prefs).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("age"));
    assert!(h.completion.requests().is_empty());
}

#[tokio::test]
async fn test_concurrent_requests_do_not_share_prompt_state() {
    let h = harness(scripted());
    h.engine.initialize().await.unwrap();

    let young = preferences();
    let mut older = preferences();
    older.age = 61;
    older.goal = Goal::WeightLoss;

    let (a, b) = tokio::join!(
        h.engine.generate_workout_plan(&young),
        h.engine.generate_workout_plan(&older),
    );
    a.unwrap();
    b.unwrap();

    let prompts: Vec<String> = h.completion.requests().into_iter().map(|r| r.prompt).collect();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts.iter().filter(|p| p.contains("Age 25,")).count(), 1);
    assert_eq!(prompts.iter().filter(|p| p.contains("Age 61,")).count(), 1);
    assert!(prompts.iter().all(|p| !(p.contains("Age 25,") && p.contains("Age 61,"))));
}

#[tokio::test]
async fn test_reindex_validates_tables_and_rebuilds() {
    let h = harness(scripted());
    h.engine.initialize().await.unwrap();
    let before = h.engine.index().active().await.unwrap().collection;

    let err = h
        .engine
        .reindex(Some(&["exercise".to_string(), "users".to_string()]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(h.engine.index().active().await.unwrap().collection, before);

    h.source.set_food_items(vec![food(9, "Nihari", false)]);
    let report = h
        .engine
        .reindex(Some(&["food_item".to_string()]))
        .await
        .unwrap();
    assert_eq!(report.status, "success");
    assert_eq!(report.documents, 6);

    let status = h.engine.status().await;
    assert!(status.healthy);
    let index = status.index.unwrap();
    assert_eq!(index.vector_count, 6);
    assert_eq!(index.last_indexed_at, Some(report.indexed_at));
    assert_ne!(index.collection, Some(before));
    assert_eq!(h.store.collection_names().len(), 1);
}

#[tokio::test]
async fn test_status_serializes_for_service_shell() {
    let h = harness(scripted());
    h.engine.initialize().await.unwrap();

    let value = serde_json::to_value(h.engine.status().await).unwrap();
    assert_eq!(value["healthy"], json!(true));
    assert_eq!(value["index"]["exists"], json!(true));
    assert_eq!(value["index"]["vector_count"], json!(8));
    assert_eq!(value["database"]["food_items"], json!(3));
    assert_eq!(value["llm_model"], json!("mock-completion"));
}
