//! Structured plan schemas
//!
//! Plans are what the generator must produce. Their JSON schema is derived
//! with `schemars` (numeric bounds included) and drives the structural
//! validation in [`crate::schema`]; the same types provide the example shape
//! embedded in prompts.

use schemars::gen::SchemaSettings;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub mod diet;
pub mod workout;

pub use diet::{DailyTotals, DietPlan, MealItem};
pub use workout::{ExerciseDetail, Reps, WorkoutDay, WorkoutPlan, WorkoutWeek};

/// A plan type that can be generated, validated and embedded as an example
pub trait PlanSchema: Serialize + DeserializeOwned + JsonSchema + Send + Sized + 'static {
    /// Human-readable plan name used in logs and errors
    const NAME: &'static str;

    /// A small valid instance showing the exact expected shape
    fn example() -> Self;

    /// JSON schema for this plan
    fn schema() -> RootSchema {
        SchemaSettings::draft07()
            .into_generator()
            .into_root_schema_for::<Self>()
    }

    /// The example rendered as pretty JSON
    fn example_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaValidator;

    #[test]
    fn test_examples_satisfy_their_own_schema() {
        let schema = WorkoutPlan::schema();
        let value = serde_json::to_value(WorkoutPlan::example()).unwrap();
        SchemaValidator::new(&schema).validate(&value).unwrap();

        let schema = DietPlan::schema();
        let value = serde_json::to_value(DietPlan::example()).unwrap();
        SchemaValidator::new(&schema).validate(&value).unwrap();
    }

    #[test]
    fn test_schema_carries_declared_bounds() {
        let json = serde_json::to_value(WorkoutPlan::schema()).unwrap();
        let detail = &json["definitions"]["ExerciseDetail"]["properties"];
        assert_eq!(detail["sets"]["minimum"], serde_json::json!(1.0));
        assert_eq!(detail["sets"]["maximum"], serde_json::json!(10.0));
        assert_eq!(detail["rest_seconds"]["maximum"], serde_json::json!(300.0));
    }
}
