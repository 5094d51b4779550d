//! Classifier response validation.
//!
//! The provider's reply must contain a single structured record matching the
//! classification contract. Violations are `InvalidResponse` errors, never
//! silent coercions; accepted records are truncated to storage bounds before
//! being handed downstream.

use std::sync::LazyLock;

use regex::Regex;

use argus_core::{Classification, Priority};

use crate::error::ClassifyError;

/// Models often wrap the JSON record in prose; take the outermost block.
static JSON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex must compile"));

/// Parse and validate the provider's text output into a [`Classification`].
///
/// `allowed_categories` are the configured PIR category codes; `"none"` is
/// always accepted.
///
/// # Errors
///
/// Returns [`ClassifyError::InvalidResponse`] when no JSON record is found,
/// a required field is missing or mistyped, the category or priority is not
/// in its enumeration, or the confidence is out of range.
pub fn parse_classification(
    text: &str,
    allowed_categories: &[String],
) -> Result<Classification, ClassifyError> {
    let json_text = JSON_BLOCK
        .find(text)
        .ok_or_else(|| invalid("no JSON object found in response"))?
        .as_str();

    let value: serde_json::Value = serde_json::from_str(json_text)
        .map_err(|e| invalid(&format!("response is not valid JSON: {e}")))?;

    let relevant = value
        .get("relevant")
        .and_then(serde_json::Value::as_bool)
        .ok_or_else(|| invalid("field \"relevant\" must be a boolean"))?;

    let category = require_str(&value, "category")?;
    if category != "none" && !allowed_categories.iter().any(|c| c == category) {
        return Err(invalid(&format!("unknown category \"{category}\"")));
    }

    let priority: Priority = require_str(&value, "priority")?
        .parse()
        .map_err(|_| invalid("field \"priority\" must be high, medium, or low"))?;

    let confidence = value
        .get("confidence")
        .and_then(serde_json::Value::as_u64)
        .filter(|&c| c <= 100)
        .ok_or_else(|| invalid("field \"confidence\" must be an integer between 0 and 100"))?;

    let title = require_str(&value, "title")?.to_string();
    let summary = require_str(&value, "summary")?.to_string();
    let reasoning = require_str(&value, "reasoning")?.to_string();

    let quote = value
        .get("quote")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();

    let tags = value
        .get("tags")
        .and_then(serde_json::Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|t| t.as_str().map(ToString::to_string))
                .collect()
        })
        .unwrap_or_default();

    #[allow(clippy::cast_possible_truncation)]
    let mut classification = Classification {
        relevant,
        category: category.to_string(),
        priority,
        confidence: confidence as u8,
        title,
        summary,
        quote,
        reasoning,
        tags,
    };
    classification.clamp();
    Ok(classification)
}

fn require_str<'v>(
    value: &'v serde_json::Value,
    field: &str,
) -> Result<&'v str, ClassifyError> {
    value
        .get(field)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| invalid(&format!("missing required field: {field}")))
}

fn invalid(reason: &str) -> ClassifyError {
    ClassifyError::InvalidResponse {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_core::SUMMARY_MAX_CHARS;

    fn allowed() -> Vec<String> {
        vec![
            "ukraine".to_string(),
            "sabotage".to_string(),
            "insider".to_string(),
        ]
    }

    fn valid_json(summary: &str) -> String {
        format!(
            r#"{{
                "relevant": true,
                "category": "sabotage",
                "priority": "high",
                "confidence": 85,
                "title": "Facility outage with attack indicators",
                "summary": "{summary}",
                "quote": "coordinated attack patterns",
                "reasoning": "Direct infrastructure threat language.",
                "tags": ["infrastructure", "energy"]
            }}"#
        )
    }

    #[test]
    fn valid_response_parses() {
        let c = parse_classification(&valid_json("Two sentences."), &allowed()).unwrap();
        assert!(c.relevant);
        assert_eq!(c.category, "sabotage");
        assert_eq!(c.priority, Priority::High);
        assert_eq!(c.confidence, 85);
        assert_eq!(c.tags.len(), 2);
    }

    #[test]
    fn json_embedded_in_prose_is_extracted() {
        let text = format!(
            "Here is my analysis:\n\n{}\n\nLet me know if you need more.",
            valid_json("Summary.")
        );
        let c = parse_classification(&text, &allowed()).unwrap();
        assert_eq!(c.category, "sabotage");
    }

    #[test]
    fn long_summary_is_truncated_to_exactly_the_bound() {
        let long_summary = "s".repeat(500);
        let c = parse_classification(&valid_json(&long_summary), &allowed()).unwrap();
        assert_eq!(c.summary.chars().count(), SUMMARY_MAX_CHARS);
        assert!(c.summary.chars().all(|ch| ch == 's'), "no corruption at the boundary");
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let text = r#"{"relevant": true, "category": "none", "priority": "low", "confidence": 10}"#;
        let err = parse_classification(text, &allowed()).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidResponse { .. }));
    }

    #[test]
    fn unknown_category_is_rejected_not_coerced() {
        let text = valid_json("Summary.").replace("sabotage", "weather");
        let err = parse_classification(&text, &allowed()).unwrap_err();
        assert!(
            matches!(err, ClassifyError::InvalidResponse { ref reason } if reason.contains("weather"))
        );
    }

    #[test]
    fn none_category_is_always_accepted() {
        let text = valid_json("Summary.").replace("\"sabotage\"", "\"none\"");
        let c = parse_classification(&text, &allowed()).unwrap();
        assert_eq!(c.category, "none");
    }

    #[test]
    fn invalid_priority_is_rejected() {
        let text = valid_json("Summary.").replace("high", "urgent");
        let err = parse_classification(&text, &allowed()).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidResponse { .. }));
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let text = valid_json("Summary.").replace("85", "250");
        let err = parse_classification(&text, &allowed()).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidResponse { .. }));
    }

    #[test]
    fn non_boolean_relevant_is_rejected() {
        let text = valid_json("Summary.").replace("true", "\"yes\"");
        let err = parse_classification(&text, &allowed()).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidResponse { .. }));
    }

    #[test]
    fn response_without_json_is_rejected() {
        let err = parse_classification("I could not analyze this.", &allowed()).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidResponse { .. }));
    }

    #[test]
    fn tags_beyond_the_cap_are_dropped() {
        let text = valid_json("Summary.").replace(
            r#"["infrastructure", "energy"]"#,
            r#"["a","b","c","d","e","f","g"]"#,
        );
        let c = parse_classification(&text, &allowed()).unwrap();
        assert_eq!(c.tags.len(), argus_core::TAGS_MAX);
    }
}
