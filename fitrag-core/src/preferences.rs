//! User preferences consumed by plan generation
//!
//! Preferences are an immutable input: the engine reads them to build queries
//! and prompts and never stores them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Wire name of this value
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(
    /// Gender used by the BMR formula
    Gender {
        /// Male
        Male => "male",
        /// Female
        Female => "female",
        /// Other (uses the female constant)
        Other => "other",
    }
);

str_enum!(
    /// Fitness goal
    Goal {
        /// Gain weight
        WeightGain => "weight_gain",
        /// Lose weight
        WeightLoss => "weight_loss",
        /// Maintain weight
        Maintain => "maintain",
        /// Build strength
        Strength => "strength",
        /// Build stamina
        Stamina => "stamina",
    }
);

str_enum!(
    /// Training experience
    ExperienceLevel {
        /// New to training
        Beginner => "beginner",
        /// Some experience
        Intermediate => "intermediate",
        /// Experienced
        Advanced => "advanced",
    }
);

str_enum!(
    /// Where workouts happen
    WorkoutLocation {
        /// At home
        Home => "home",
        /// In a gym
        Gym => "gym",
    }
);

str_enum!(
    /// Dietary preference
    DietaryPreference {
        /// Vegetarian only
        Veg => "veg",
        /// Includes meat
        NonVeg => "non_veg",
        /// Both
        Mixed => "mixed",
    }
);

impl Default for ExperienceLevel {
    fn default() -> Self {
        Self::Beginner
    }
}

impl Default for DietaryPreference {
    fn default() -> Self {
        Self::Mixed
    }
}

/// Everything the caller knows about the user that shapes a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Age in years (10-100)
    pub age: u32,
    /// Weight in kg (30-300)
    pub weight: f64,
    /// Height in cm (100-250)
    pub height: f64,
    /// Gender
    pub gender: Gender,
    /// Fitness goal
    pub goal: Goal,
    /// Training experience
    #[serde(default)]
    pub experience_level: ExperienceLevel,
    /// Home or gym
    pub workout_location: WorkoutLocation,
    /// Equipment the user has
    #[serde(default)]
    pub equipment_list: Vec<String>,
    /// Muscle groups to emphasise
    #[serde(default)]
    pub target_muscle_groups: Vec<String>,
    /// Plan length in weeks (4-52)
    #[serde(default = "default_duration_weeks")]
    pub duration_weeks: u32,
    /// Workouts per week (1-7)
    #[serde(default = "default_frequency_per_week")]
    pub frequency_per_week: u32,
    /// Dietary preference
    #[serde(default)]
    pub dietary_preference: DietaryPreference,
    /// Foods to leave out
    #[serde(default)]
    pub excluded_foods: Vec<String>,
    /// Food allergies
    #[serde(default)]
    pub allergies: Vec<String>,
    /// Medical conditions to respect
    #[serde(default)]
    pub medical_conditions: Vec<String>,
}

fn default_duration_weeks() -> u32 {
    4
}

fn default_frequency_per_week() -> u32 {
    5
}

impl UserPreferences {
    /// Preferences with the required fields set and defaults elsewhere
    pub fn new(
        age: u32,
        weight: f64,
        height: f64,
        gender: Gender,
        goal: Goal,
        workout_location: WorkoutLocation,
    ) -> Self {
        Self {
            age,
            weight,
            height,
            gender,
            goal,
            experience_level: ExperienceLevel::default(),
            workout_location,
            equipment_list: Vec::new(),
            target_muscle_groups: Vec::new(),
            duration_weeks: default_duration_weeks(),
            frequency_per_week: default_frequency_per_week(),
            dietary_preference: DietaryPreference::default(),
            excluded_foods: Vec::new(),
            allergies: Vec::new(),
            medical_conditions: Vec::new(),
        }
    }

    /// Check every bounded field, naming the first one out of range
    pub fn validate(&self) -> Result<()> {
        check_range("age", f64::from(self.age), 10.0, 100.0)?;
        check_range("weight", self.weight, 30.0, 300.0)?;
        check_range("height", self.height, 100.0, 250.0)?;
        check_range("duration_weeks", f64::from(self.duration_weeks), 4.0, 52.0)?;
        check_range("frequency_per_week", f64::from(self.frequency_per_week), 1.0, 7.0)?;
        Ok(())
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_nan() || value < min || value > max {
        return Err(Error::InvalidInput(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_applies_defaults() {
        let prefs: UserPreferences = serde_json::from_value(serde_json::json!({
            "age": 25,
            "weight": 70,
            "height": 170,
            "gender": "male",
            "goal": "weight_loss",
            "workout_location": "gym"
        }))
        .unwrap();

        assert_eq!(prefs.experience_level, ExperienceLevel::Beginner);
        assert_eq!(prefs.dietary_preference, DietaryPreference::Mixed);
        assert_eq!(prefs.duration_weeks, 4);
        assert_eq!(prefs.frequency_per_week, 5);
        assert!(prefs.equipment_list.is_empty());
        assert!(prefs.validate().is_ok());
    }

    #[test]
    fn test_unknown_goal_is_rejected() {
        let result = serde_json::from_value::<UserPreferences>(serde_json::json!({
            "age": 25, "weight": 70, "height": 170, "gender": "male",
            "goal": "bulk", "workout_location": "gym"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_names_field() {
        let mut prefs = UserPreferences::new(
            25, 70.0, 170.0, Gender::Female, Goal::Maintain, WorkoutLocation::Home,
        );
        prefs.frequency_per_week = 9;
        let err = prefs.validate().unwrap_err();
        assert!(err.to_string().contains("frequency_per_week"));

        prefs.frequency_per_week = 3;
        prefs.weight = f64::NAN;
        assert!(prefs.validate().unwrap_err().to_string().contains("weight"));
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(Goal::WeightGain.to_string(), "weight_gain");
        assert_eq!(DietaryPreference::NonVeg.as_str(), "non_veg");
        assert_eq!(
            serde_json::to_value(ExperienceLevel::Advanced).unwrap(),
            serde_json::json!("advanced")
        );
    }
}
