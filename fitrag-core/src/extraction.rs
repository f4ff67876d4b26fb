//! Output extraction
//!
//! Models are asked for bare JSON but often wrap it in a markdown code fence
//! or add a sentence around it. Extraction keeps only the payload, parses it,
//! and checks it against the plan schema before the typed value is built.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::plan::PlanSchema;
use crate::schema::SchemaValidator;

const FENCE: &str = "```";

/// Strip a surrounding markdown fence if present.
///
/// With a fence, the content of the first fenced block is returned with any
/// language tag removed. Without one, the trimmed text is returned as is.
pub fn strip_code_fence(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    let Some(open) = trimmed.find(FENCE) else {
        return Ok(trimmed);
    };

    let after_open = &trimmed[open + FENCE.len()..];
    let tag_len = after_open
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(after_open.len());
    let body = &after_open[tag_len..];

    match body.find(FENCE) {
        Some(close) => Ok(body[..close].trim()),
        None => Err(Error::malformed_output("unterminated code fence", text)),
    }
}

/// Parse the payload of a model response as JSON
pub fn parse_json(text: &str) -> Result<Value> {
    let payload = strip_code_fence(text)?;
    if payload.is_empty() {
        return Err(Error::malformed_output("empty response", text));
    }
    serde_json::from_str(payload)
        .map_err(|e| Error::malformed_output(format!("invalid JSON: {e}"), payload))
}

/// Validate a parsed value against `T`'s schema and build it
pub fn validate_plan<T: PlanSchema>(value: Value) -> Result<T> {
    let schema = T::schema();
    SchemaValidator::new(&schema).validate(&value)?;
    serde_json::from_value(value).map_err(|e| Error::schema_violation(T::NAME, e.to_string()))
}

/// Extract, parse and validate a plan from raw model output
pub fn extract_plan<T: PlanSchema>(raw: &str) -> Result<T> {
    let value = parse_json(raw)?;
    validate_plan(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::plan::{DietPlan, WorkoutPlan};

    #[test]
    fn test_bare_json_passes_through() {
        assert_eq!(strip_code_fence("  {\"a\": 1}\n").unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_fence_with_language_tag() {
        let raw = "Here is your plan:\n```json\n{\"a\": 1}\n```\nEnjoy!";
        assert_eq!(strip_code_fence(raw).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_fence_without_tag_and_inline() {
        assert_eq!(strip_code_fence("```\n[1, 2]\n```").unwrap(), "[1, 2]");
        assert_eq!(strip_code_fence("```json {\"a\": 1}```").unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_first_fenced_block_wins() {
        let raw = "```json\n{\"first\": true}\n```\n```json\n{\"second\": true}\n```";
        assert_eq!(parse_json(raw).unwrap()["first"], serde_json::json!(true));
    }

    #[test]
    fn test_unterminated_fence_is_malformed() {
        let err = strip_code_fence("```json\n{\"a\": 1}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedOutput);
    }

    #[test]
    fn test_unbalanced_braces_are_malformed() {
        let err = parse_json("{\"total_weeks\": 4, \"weeks\": [").unwrap_err();
        match err {
            Error::MalformedOutput { snippet, .. } => assert!(snippet.starts_with("{\"total_weeks\"")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_response_is_malformed() {
        assert_eq!(parse_json("   ").unwrap_err().kind(), ErrorKind::MalformedOutput);
        assert_eq!(parse_json("```json\n```").unwrap_err().kind(), ErrorKind::MalformedOutput);
    }

    #[test]
    fn test_extract_plan_from_fenced_example() {
        let json = serde_json::to_string_pretty(&WorkoutPlan::example()).unwrap();
        let raw = format!("```json\n{json}\n```");
        let plan: WorkoutPlan = extract_plan(&raw).unwrap();
        assert_eq!(plan, WorkoutPlan::example());
    }

    #[test]
    fn test_extract_plan_reports_schema_violation() {
        let mut value = serde_json::to_value(DietPlan::example()).unwrap();
        value["total_daily_calories"] = serde_json::json!(800);
        let err = extract_plan::<DietPlan>(&value.to_string()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        assert!(err.to_string().contains("total_daily_calories"));
    }

    #[test]
    fn test_oversized_integer_names_failing_field() {
        let mut value = serde_json::to_value(WorkoutPlan::example()).unwrap();
        value["weeks"][0]["week_number"] = serde_json::json!(u64::MAX);
        match validate_plan::<WorkoutPlan>(value).unwrap_err() {
            Error::SchemaViolation { field, .. } => assert_eq!(field, "weeks[0].week_number"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
