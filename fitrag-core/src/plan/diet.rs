//! Daily diet plan

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::PlanSchema;
use crate::nutrition::MacroTargets;

/// One food in a meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MealItem {
    /// Food name from the catalogue
    pub food_name: String,
    /// e.g. `"2 pieces"`, `"1 cup"`
    pub serving_size: String,
    /// kcal
    #[schemars(range(min = 0))]
    pub calories: f64,
    /// Protein grams
    #[schemars(range(min = 0))]
    pub protein: f64,
    /// Carbohydrate grams
    #[schemars(range(min = 0))]
    pub carbs: f64,
    /// Fat grams
    #[schemars(range(min = 0))]
    pub fats: f64,
}

/// Sum of all meals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DailyTotals {
    /// kcal
    #[schemars(range(min = 0))]
    pub calories: f64,
    /// Protein grams
    #[schemars(range(min = 0))]
    pub protein: f64,
    /// Carbohydrate grams
    #[schemars(range(min = 0))]
    pub carbs: f64,
    /// Fat grams
    #[schemars(range(min = 0))]
    pub fats: f64,
}

/// A one-day diet plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DietPlan {
    /// Daily kcal target (1000-5000)
    #[schemars(range(min = 1000, max = 5000))]
    pub total_daily_calories: f64,
    /// Daily protein target in grams (50-400)
    #[schemars(range(min = 50, max = 400))]
    pub total_daily_protein: f64,
    /// Short overview of the day
    pub summary: String,
    /// Meal name (`breakfast`, `lunch`, ...) to items
    pub meals: BTreeMap<String, Vec<MealItem>>,
    /// Totals across all meals
    pub daily_totals: DailyTotals,
}

impl DietPlan {
    /// Example shape carrying the computed targets
    pub fn example_for(targets: &MacroTargets) -> Self {
        let mut plan = Self::example();
        plan.total_daily_calories = targets.calories as f64;
        plan.total_daily_protein = targets.protein_g as f64;
        plan.daily_totals = DailyTotals {
            calories: targets.calories as f64,
            protein: targets.protein_g as f64,
            carbs: targets.carbs_g as f64,
            fats: targets.fats_g as f64,
        };
        plan
    }
}

impl PlanSchema for DietPlan {
    const NAME: &'static str = "diet_plan";

    fn example() -> Self {
        let item = |food_name: &str, serving_size: &str, calories, protein, carbs, fats| MealItem {
            food_name: food_name.to_string(),
            serving_size: serving_size.to_string(),
            calories,
            protein,
            carbs,
            fats,
        };

        let mut meals = BTreeMap::new();
        meals.insert(
            "breakfast".to_string(),
            vec![item("Paratha", "1 piece", 260.0, 5.0, 36.0, 10.0)],
        );
        meals.insert(
            "lunch".to_string(),
            vec![item("Chicken Karahi", "1 bowl", 330.0, 28.0, 8.0, 20.0)],
        );
        meals.insert(
            "dinner".to_string(),
            vec![item("Daal Chana", "1 bowl", 240.0, 13.0, 40.0, 4.0)],
        );
        meals.insert(
            "snacks".to_string(),
            vec![item("Lassi", "1 glass", 170.0, 8.0, 20.0, 6.0)],
        );

        Self {
            total_daily_calories: 2000.0,
            total_daily_protein: 120.0,
            summary: "Balanced high protein day".to_string(),
            meals,
            daily_totals: DailyTotals {
                calories: 2000.0,
                protein: 120.0,
                carbs: 250.0,
                fats: 55.0,
            },
        }
    }
}
