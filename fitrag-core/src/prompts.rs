//! Prompt compilation
//!
//! Renders retrieval context, preferences and macro targets into one
//! completion prompt per plan type. Compilation is a pure function of its
//! inputs. Every field is always rendered; empty lists become `None`.

use crate::error::Result;
use crate::nutrition::MacroTargets;
use crate::plan::{DietPlan, PlanSchema, WorkoutPlan};
use crate::preferences::UserPreferences;

/// Placeholder for an empty list or empty context
pub const NONE_PLACEHOLDER: &str = "None";

/// Build the workout generation prompt
pub fn compile_workout_prompt(
    preferences: &UserPreferences,
    exercise_context: &str,
) -> Result<String> {
    let example = WorkoutPlan::example_for(
        preferences.duration_weeks,
        preferences.frequency_per_week,
    )
    .example_json()?;

    Ok(format!(
        "Create a {weeks}-week workout plan for {goal}, {level}, {location}.

USER: Age {age}, Weight {weight}kg, Height {height}cm, Gender {gender}
TARGET MUSCLES: {targets}
MEDICAL CONDITIONS: {medical}

EXERCISES:
{context}

CRITICAL RULES:
1. VARIETY: never repeat the same exercise on the same weekday across weeks.
2. MUSCLE MATCHING: only use exercises that match the day's focus.
3. PROGRESSION: increase difficulty week over week by adjusting sets, reps and rest.
4. VOLUME: 4-5 exercises per day.
5. EQUIPMENT: {equipment}. LOCATION: {location}.
6. BOUNDS: total_weeks {weeks}, frequency_per_week {frequency}, sets 1-10, rest_seconds 30-300, week_number and day_number start at 1.

Respond with a single JSON object exactly matching this shape and nothing else (no markdown, no commentary):
{example}

Generate ALL {weeks} weeks with {frequency} days each. Return ONLY JSON.",
        weeks = preferences.duration_weeks,
        frequency = preferences.frequency_per_week,
        goal = preferences.goal,
        level = preferences.experience_level,
        location = preferences.workout_location,
        age = preferences.age,
        weight = preferences.weight,
        height = preferences.height,
        gender = preferences.gender,
        targets = join_or_none(&preferences.target_muscle_groups),
        medical = join_or_none(&preferences.medical_conditions),
        equipment = join_or_none(&preferences.equipment_list),
        context = context_or_none(exercise_context),
    ))
}

/// Build the diet generation prompt
pub fn compile_diet_prompt(
    preferences: &UserPreferences,
    food_context: &str,
    macros: &MacroTargets,
) -> Result<String> {
    let example = DietPlan::example_for(macros).example_json()?;

    Ok(format!(
        "Create a personalized one-day Pakistani diet plan for this user.

USER: Age {age}, Weight {weight}kg, Height {height}cm, Gender {gender}
GOAL: {goal}
PREFERENCE: {preference}
AVOID: {excluded}. ALLERGIES: {allergies}. MEDICAL CONDITIONS: {medical}
TARGETS: {calories}kcal, {protein}g protein, {carbs}g carbs, {fats}g fats

FOODS:
{context}

CRITICAL RULES:
1. GOAL-BASED SELECTION:
   - weight_loss: high protein, low carb, plenty of vegetables
   - weight_gain: high carb, moderate protein, healthy fats
   - strength, stamina, maintain: balanced meals around the targets
2. PREFERENCE MATCHING: veg means vegetarian items only; non_veg includes meat proteins; mixed balances both.
3. Never use avoided foods or allergens.
4. Match the targets within 5%. total_daily_calories 1000-5000, total_daily_protein 50-400, all nutrient values >= 0.

Respond with a single JSON object exactly matching this shape and nothing else (no markdown, no commentary):
{example}

Return ONLY JSON.",
        age = preferences.age,
        weight = preferences.weight,
        height = preferences.height,
        gender = preferences.gender,
        goal = preferences.goal,
        preference = preferences.dietary_preference,
        excluded = join_or_none(&preferences.excluded_foods),
        allergies = join_or_none(&preferences.allergies),
        medical = join_or_none(&preferences.medical_conditions),
        calories = macros.calories,
        protein = macros.protein_g,
        carbs = macros.carbs_g,
        fats = macros.fats_g,
        context = context_or_none(food_context),
    ))
}

fn join_or_none(items: &[String]) -> String {
    let items: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        NONE_PLACEHOLDER.to_string()
    } else {
        items.join(", ")
    }
}

fn context_or_none(context: &str) -> &str {
    let trimmed = context.trim();
    if trimmed.is_empty() {
        NONE_PLACEHOLDER
    } else {
        trimmed
    }
}
