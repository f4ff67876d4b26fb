//! Multi-week workout plan

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::PlanSchema;

/// Repetitions: a count, or a description such as `"8-12"` or `"30 seconds"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Reps {
    /// Fixed repetition count
    Count(u32),
    /// Range or duration
    Description(String),
}

/// One exercise prescription within a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExerciseDetail {
    /// Name as it appears in the exercise catalogue
    pub exercise_name: String,
    /// Number of sets (1-10)
    #[schemars(range(min = 1, max = 10))]
    pub sets: u32,
    /// Repetitions per set
    pub reps: Reps,
    /// Rest between sets (30-300 s)
    #[schemars(range(min = 30, max = 300))]
    pub rest_seconds: u32,
    /// Form cue or progression hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One training day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkoutDay {
    /// 1-based day within the week
    #[schemars(range(min = 1))]
    pub day_number: u32,
    /// Muscle focus of the day, e.g. `"Chest & Triceps"`
    pub focus: String,
    /// Exercises in order
    pub exercises: Vec<ExerciseDetail>,
}

/// One week of training days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkoutWeek {
    /// 1-based week number
    #[schemars(range(min = 1))]
    pub week_number: u32,
    /// Training days, at least one
    #[schemars(length(min = 1))]
    pub days: Vec<WorkoutDay>,
}

/// A complete workout plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkoutPlan {
    /// Plan length in weeks (1-52)
    #[schemars(range(min = 1, max = 52))]
    pub total_weeks: u32,
    /// Training days per week (1-7)
    #[schemars(range(min = 1, max = 7))]
    pub frequency_per_week: u32,
    /// Short overview of the programme
    pub summary: String,
    /// Weeks in order, at least one
    #[schemars(length(min = 1))]
    pub weeks: Vec<WorkoutWeek>,
}

impl WorkoutPlan {
    /// Example shape sized to the requested plan length
    pub fn example_for(total_weeks: u32, frequency_per_week: u32) -> Self {
        Self {
            total_weeks,
            frequency_per_week,
            ..Self::example()
        }
    }

    /// Total number of exercise prescriptions across all weeks
    pub fn exercise_count(&self) -> usize {
        self.weeks
            .iter()
            .flat_map(|w| &w.days)
            .map(|d| d.exercises.len())
            .sum()
    }
}

impl PlanSchema for WorkoutPlan {
    const NAME: &'static str = "workout_plan";

    fn example() -> Self {
        Self {
            total_weeks: 1,
            frequency_per_week: 1,
            summary: "Progressive full body programme".to_string(),
            weeks: vec![WorkoutWeek {
                week_number: 1,
                days: vec![WorkoutDay {
                    day_number: 1,
                    focus: "Chest & Triceps".to_string(),
                    exercises: vec![
                        ExerciseDetail {
                            exercise_name: "Push Ups".to_string(),
                            sets: 3,
                            reps: Reps::Count(12),
                            rest_seconds: 60,
                            notes: Some("Keep core tight".to_string()),
                        },
                        ExerciseDetail {
                            exercise_name: "Plank".to_string(),
                            sets: 3,
                            reps: Reps::Description("30 seconds".to_string()),
                            rest_seconds: 45,
                            notes: None,
                        },
                    ],
                }],
            }],
        }
    }
}
