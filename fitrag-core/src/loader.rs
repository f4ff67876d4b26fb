//! Document builder
//!
//! Converts exercise and food item rows into [`Document`]s. Rendering is a pure
//! function of the row, so the same row always yields byte-identical text.
//! Sub-fields stored as encoded JSON (equipment lists, vitamin and mineral
//! maps) are flattened into display strings; a row whose encoding is broken
//! gets `N/A` for that field instead of failing the whole batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::{Document, Metadata, MetadataValue, SourceKind};

/// Upper bound on rendered document text, in characters
pub const MAX_DOCUMENT_CHARS: usize = 2000;

/// Placeholder for a field whose encoding could not be decoded
pub const UNREADABLE: &str = "N/A";

/// One row of the `exercise` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    /// Primary key
    pub id: i64,
    /// Exercise name
    pub name: String,
    /// Primary muscle group
    pub muscle_group: String,
    /// beginner / intermediate / advanced
    pub difficulty: String,
    /// JSON-encoded list of equipment names
    pub equipment_required: Option<String>,
    /// Free-text description
    pub description: Option<String>,
    /// Demo video link
    pub video_url: Option<String>,
}

/// One row of the `food_item` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodItemRecord {
    /// Primary key
    pub id: i64,
    /// Food name
    pub name: String,
    /// Category (bread, curry, dairy, ...)
    pub category: String,
    /// kcal per 100 g
    pub calories_per_100g: f64,
    /// Protein grams per 100 g
    pub protein_per_100g: f64,
    /// Carbohydrate grams per 100 g
    pub carbs_per_100g: f64,
    /// Fat grams per 100 g
    pub fats_per_100g: f64,
    /// JSON-encoded map of vitamin name to amount
    pub vitamins: Option<String>,
    /// JSON-encoded map of mineral name to amount
    pub minerals: Option<String>,
    /// Typical serving
    pub serving_description: Option<String>,
    /// Vegetarian flag
    pub is_veg: bool,
    /// Free-text description
    pub description: Option<String>,
}

/// Build one document per exercise row
pub fn build_exercise_documents(records: &[ExerciseRecord]) -> Vec<Document> {
    let docs: Vec<Document> = records.iter().map(exercise_document).collect();
    debug!(count = docs.len(), "built exercise documents");
    docs
}

/// Build one document per food item row
pub fn build_food_documents(records: &[FoodItemRecord]) -> Vec<Document> {
    let docs: Vec<Document> = records.iter().map(food_document).collect();
    debug!(count = docs.len(), "built food item documents");
    docs
}

/// Render a single exercise row
pub fn exercise_document(record: &ExerciseRecord) -> Document {
    let equipment = decode_list(record.id, "equipment_required", record.equipment_required.as_deref());
    let description = non_blank(record.description.as_deref()).unwrap_or(UNREADABLE);

    let text = format!(
        "{} | {} | {} | Equip: {} | {}",
        record.name, record.muscle_group, record.difficulty, equipment, description
    );

    let mut metadata = Metadata::new();
    metadata.insert("name".into(), record.name.as_str().into());
    metadata.insert("muscle_group".into(), record.muscle_group.as_str().into());
    metadata.insert("difficulty".into(), record.difficulty.as_str().into());
    metadata.insert("equipment".into(), MetadataValue::Text(equipment));

    Document::new(SourceKind::Exercise, record.id, bound(text.trim()), metadata)
}

/// Render a single food item row
pub fn food_document(record: &FoodItemRecord) -> Document {
    let vitamins = decode_map(record.id, "vitamins", record.vitamins.as_deref());
    let minerals = decode_map(record.id, "minerals", record.minerals.as_deref());
    let serving = non_blank(record.serving_description.as_deref()).unwrap_or("Standard serving");
    let description =
        non_blank(record.description.as_deref()).unwrap_or("No description available");

    let text = format!(
        "Food Item: {name}\n\
         ID: {id}\n\
         Category: {category}\n\
         Vegetarian: {veg}\n\
         Nutritional Information (per 100g):\n\
         \x20 - Calories: {calories} kcal\n\
         \x20 - Protein: {protein} g\n\
         \x20 - Carbohydrates: {carbs} g\n\
         \x20 - Fats: {fats} g\n\
         Vitamins: {vitamins}\n\
         Minerals: {minerals}\n\
         Serving Description: {serving}\n\
         Description: {description}",
        name = record.name,
        id = record.id,
        category = record.category,
        veg = if record.is_veg { "Yes" } else { "No" },
        calories = record.calories_per_100g,
        protein = record.protein_per_100g,
        carbs = record.carbs_per_100g,
        fats = record.fats_per_100g,
    );

    let mut metadata = Metadata::new();
    metadata.insert("name".into(), record.name.as_str().into());
    metadata.insert("category".into(), record.category.as_str().into());
    metadata.insert("is_veg".into(), record.is_veg.into());
    metadata.insert("calories".into(), record.calories_per_100g.into());
    metadata.insert("protein".into(), record.protein_per_100g.into());

    Document::new(SourceKind::FoodItem, record.id, bound(&text), metadata)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Decode a JSON list of strings into `a, b, c`; empty or absent is `None`.
fn decode_list(row_id: i64, field: &str, raw: Option<&str>) -> String {
    let Some(raw) = non_blank(raw) else {
        return "None".to_string();
    };
    match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(items) if items.is_empty() => "None".to_string(),
        Ok(items) => items.iter().map(display_scalar).collect::<Vec<_>>().join(", "),
        Err(e) => {
            warn!(row_id, field, error = %e, "unreadable encoded list, using placeholder");
            UNREADABLE.to_string()
        }
    }
}

/// Decode a JSON object into `k: v, ...` in key order; empty or absent is `Not specified`.
fn decode_map(row_id: i64, field: &str, raw: Option<&str>) -> String {
    let Some(raw) = non_blank(raw) else {
        return "Not specified".to_string();
    };
    match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(raw) {
        Ok(map) if map.is_empty() => "Not specified".to_string(),
        Ok(map) => map
            .iter()
            .map(|(k, v)| format!("{k}: {}", display_scalar(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Err(e) => {
            warn!(row_id, field, error = %e, "unreadable encoded map, using placeholder");
            UNREADABLE.to_string()
        }
    }
}

fn display_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn bound(text: &str) -> String {
    match text.char_indices().nth(MAX_DOCUMENT_CHARS) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}
