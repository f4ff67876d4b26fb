//! Daily macro targets
//!
//! Pure arithmetic: BMR by Mifflin-St Jeor, a fixed moderate activity factor,
//! a goal adjustment and a protein/fat/carb split. Every rounding step
//! truncates toward zero, so identical inputs always give identical targets.

use serde::{Deserialize, Serialize};

use crate::preferences::{Gender, Goal, UserPreferences};

/// Moderate activity multiplier applied to BMR
pub const ACTIVITY_FACTOR: f64 = 1.55;
/// Share of calories that come from fat
pub const FAT_CALORIE_SHARE: f64 = 0.25;

const KCAL_PER_G_PROTEIN: i64 = 4;
const KCAL_PER_G_CARBS: i64 = 4;
const KCAL_PER_G_FAT: i64 = 9;

/// Daily calorie and macro targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroTargets {
    /// kcal per day
    pub calories: i64,
    /// Protein grams per day
    pub protein_g: i64,
    /// Carbohydrate grams per day
    pub carbs_g: i64,
    /// Fat grams per day
    pub fats_g: i64,
}

/// Basal metabolic rate in kcal/day
pub fn basal_metabolic_rate(weight_kg: f64, height_cm: f64, age: u32, gender: Gender) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    match gender {
        Gender::Male => base + 5.0,
        Gender::Female | Gender::Other => base - 161.0,
    }
}

/// Total daily energy expenditure in kcal/day
pub fn total_daily_energy_expenditure(
    weight_kg: f64,
    height_cm: f64,
    age: u32,
    gender: Gender,
) -> f64 {
    basal_metabolic_rate(weight_kg, height_cm, age, gender) * ACTIVITY_FACTOR
}

/// Calorie offset and protein grams per kg for a goal
pub fn goal_adjustment(goal: Goal) -> (f64, f64) {
    match goal {
        Goal::WeightLoss => (-500.0, 2.0),
        Goal::WeightGain => (300.0, 1.8),
        Goal::Maintain | Goal::Strength | Goal::Stamina => (0.0, 1.6),
    }
}

/// Compute daily macro targets
pub fn compute_macros(
    weight_kg: f64,
    height_cm: f64,
    age: u32,
    gender: Gender,
    goal: Goal,
) -> MacroTargets {
    let tdee = total_daily_energy_expenditure(weight_kg, height_cm, age, gender);
    let (calorie_offset, protein_per_kg) = goal_adjustment(goal);

    let calories = (tdee + calorie_offset) as i64;
    let protein_g = (weight_kg * protein_per_kg) as i64;
    let fats_g = (calories as f64 * FAT_CALORIE_SHARE / KCAL_PER_G_FAT as f64) as i64;
    let residual = calories - KCAL_PER_G_PROTEIN * protein_g - KCAL_PER_G_FAT * fats_g;
    let carbs_g = (residual as f64 / KCAL_PER_G_CARBS as f64) as i64;

    MacroTargets {
        calories,
        protein_g,
        carbs_g,
        fats_g,
    }
}

/// Compute daily macro targets from preferences
pub fn macros_for(preferences: &UserPreferences) -> MacroTargets {
    compute_macros(
        preferences.weight,
        preferences.height,
        preferences.age,
        preferences.gender,
        preferences.goal,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_male_maintain() {
        assert_eq!(basal_metabolic_rate(70.0, 170.0, 25, Gender::Male), 1642.5);
        assert_eq!(
            compute_macros(70.0, 170.0, 25, Gender::Male, Goal::Maintain),
            MacroTargets { calories: 2545, protein_g: 112, carbs_g: 366, fats_g: 70 }
        );
    }

    #[test]
    fn test_goal_table() {
        assert_eq!(
            compute_macros(70.0, 170.0, 25, Gender::Male, Goal::WeightLoss),
            MacroTargets { calories: 2045, protein_g: 140, carbs_g: 245, fats_g: 56 }
        );
        assert_eq!(
            compute_macros(70.0, 170.0, 25, Gender::Male, Goal::WeightGain),
            MacroTargets { calories: 2845, protein_g: 126, carbs_g: 407, fats_g: 79 }
        );
        assert_eq!(goal_adjustment(Goal::Strength), (0.0, 1.6));
        assert_eq!(goal_adjustment(Goal::Stamina), (0.0, 1.6));
    }

    #[test]
    fn test_female_and_other_share_constant() {
        let female = compute_macros(60.0, 165.0, 30, Gender::Female, Goal::Maintain);
        let other = compute_macros(60.0, 165.0, 30, Gender::Other, Goal::Maintain);
        assert_eq!(female, other);
        assert_eq!(
            female,
            MacroTargets { calories: 2046, protein_g: 96, carbs_g: 289, fats_g: 56 }
        );
    }

    #[test]
    fn test_fractional_weight_truncates() {
        assert_eq!(
            compute_macros(55.5, 160.0, 40, Gender::Other, Goal::Strength),
            MacroTargets { calories: 1850, protein_g: 88, carbs_g: 259, fats_g: 51 }
        );
    }

    #[test]
    fn test_is_reproducible() {
        let first = compute_macros(83.2, 181.0, 37, Gender::Male, Goal::WeightGain);
        for _ in 0..100 {
            assert_eq!(compute_macros(83.2, 181.0, 37, Gender::Male, Goal::WeightGain), first);
        }
    }
}
