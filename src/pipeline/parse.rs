//! Validation of the model's reply.
//!
//! The model is asked for `{"summary": "...", "tags": [...]}` and nothing
//! else, but replies drift: code fences around the JSON, a bare string where
//! a list was asked for, numbers among the tags, duplicate tags in different
//! case. [`parse_reply`] accepts those drifts and rejects everything that is
//! not recognisably the contract.
//!
//! Accepted shapes:
//!
//! | field     | accepted                                         |
//! |-----------|--------------------------------------------------|
//! | `summary` | string, `null` (empty), number or bool (stringified) |
//! | `tags`    | list of strings/numbers/bools (`null` entries dropped), a single string, `null` |
//!
//! Both keys must be present.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::DocMetaError;
use crate::output::DocumentMetadata;

/// Parse and normalise one model reply.
pub fn parse_reply(raw: &str) -> Result<DocumentMetadata, DocMetaError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(parsing("Empty response from AI"));
    }

    let content = strip_fences(content);
    let value: Value = serde_json::from_str(&content).map_err(|e| {
        debug!("Unparseable model reply: {}", content);
        parsing(format!("Invalid JSON response: {e}"))
    })?;

    let Value::Object(map) = value else {
        return Err(parsing("AI response is not a JSON object"));
    };
    let (raw_summary, raw_tags) = required_fields(&map)?;

    let summary = coerce_summary(raw_summary)?;
    if summary.is_empty() && is_empty_tags(raw_tags) {
        return Ok(DocumentMetadata::non_medical());
    }

    let tags = dedup(
        coerce_tags(raw_tags)?
            .iter()
            .filter_map(|t| normalise_tag(t))
            .collect(),
    );

    Ok(DocumentMetadata { summary, tags })
}

fn parsing(msg: impl Into<String>) -> DocMetaError {
    DocMetaError::ResponseParsing(msg.into())
}

/// Drop every line that opens or closes a markdown code fence.
fn strip_fences(content: &str) -> String {
    if !content.starts_with("```") {
        return content.to_string();
    }
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn required_fields(map: &Map<String, Value>) -> Result<(&Value, &Value), DocMetaError> {
    match (map.get("summary"), map.get("tags")) {
        (Some(summary), Some(tags)) => Ok((summary, tags)),
        _ => Err(parsing("Missing required fields in AI response")),
    }
}

fn coerce_summary(value: &Value) -> Result<String, DocMetaError> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Null => Ok(String::new()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(_) | Value::Object(_) => Err(parsing("summary must be a string")),
    }
}

fn is_empty_tags(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn coerce_tags(value: &Value) -> Result<Vec<String>, DocMetaError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| scalar_tag(item).transpose())
            .collect(),
        _ => Err(parsing("tags must be a list of strings")),
    }
}

/// `null` entries are dropped; nested lists and objects are not tags.
fn scalar_tag(value: &Value) -> Result<Option<String>, DocMetaError> {
    match value {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Null => Ok(None),
        Value::Array(_) | Value::Object(_) => Err(parsing("tags must contain only scalar values")),
    }
}

/// Trim, lowercase, spaces to underscores; single-character tags are noise.
fn normalise_tag(tag: &str) -> Option<String> {
    let tag = tag.trim().to_lowercase().replace(' ', "_");
    (tag.chars().count() > 1).then_some(tag)
}

fn dedup(tags: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err_of(raw: &str) -> DocMetaError {
        parse_reply(raw).unwrap_err()
    }

    #[test]
    fn plain_reply() {
        let raw = r#"{"summary": "  Routine blood panel, all values in range. ",
            "tags": ["lab_results", "Blood Test"]}"#;
        let m = parse_reply(raw).unwrap();
        assert_eq!(m.summary, "Routine blood panel, all values in range.");
        assert_eq!(m.tags, vec!["lab_results", "blood_test"]);
    }

    #[test]
    fn tags_are_normalised_and_deduplicated() {
        let m =
            parse_reply(r#"{"summary": "s", "tags": ["Chest Pain", "chest_pain", "A"]}"#).unwrap();
        assert_eq!(m.tags, vec!["chest_pain"]);

        let m = parse_reply(r#"{"summary": "s", "tags": ["flu", "Flu", " "]}"#).unwrap();
        assert_eq!(m.tags, vec!["flu"]);
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let m = parse_reply(
            r#"{"summary": "s", "tags": ["urgent", "cardiology", "URGENT", "ecg", "cardiology"]}"#,
        )
        .unwrap();
        assert_eq!(m.tags, vec!["urgent", "cardiology", "ecg"]);
    }

    #[test]
    fn fenced_reply_is_unwrapped() {
        let raw = "```json\n{\"summary\": \"Prescription for amoxicillin.\", \
                   \"tags\": [\"prescription\"]}\n```";
        let m = parse_reply(raw).unwrap();
        assert_eq!(m.summary, "Prescription for amoxicillin.");
        assert_eq!(m.tags, vec!["prescription"]);
    }

    #[test]
    fn non_medical_reply_is_canonical_empty() {
        for raw in [
            r#"{"summary": "", "tags": []}"#,
            r#"{"summary": "   ", "tags": ""}"#,
            r#"{"summary": null, "tags": null}"#,
        ] {
            let m = parse_reply(raw).unwrap();
            assert!(m.is_non_medical(), "{raw}");
        }
    }

    #[test]
    fn single_string_tag_becomes_list() {
        let m = parse_reply(r#"{"summary": "s", "tags": "Radiology"}"#).unwrap();
        assert_eq!(m.tags, vec!["radiology"]);
    }

    #[test]
    fn scalar_tags_are_stringified() {
        let m = parse_reply(r#"{"summary": "s", "tags": ["covid", 19, true]}"#).unwrap();
        assert_eq!(m.tags, vec!["covid", "19", "true"]);
    }

    #[test]
    fn null_tag_entries_are_dropped() {
        let m = parse_reply(r#"{"summary": "Influenza.", "tags": ["flu", null]}"#).unwrap();
        assert_eq!(m.summary, "Influenza.");
        assert_eq!(m.tags, vec!["flu"]);
    }

    #[test]
    fn summary_with_empty_tags_is_kept() {
        let m = parse_reply(r#"{"summary": "Discharge letter.", "tags": []}"#).unwrap();
        assert_eq!(m.summary, "Discharge letter.");
        assert!(m.tags.is_empty());
    }

    #[test]
    fn empty_reply_fails() {
        assert_eq!(err_of(""), parsing("Empty response from AI"));
        assert_eq!(err_of(" \n "), parsing("Empty response from AI"));
    }

    #[test]
    fn malformed_json_fails_with_detail() {
        let err = err_of("Sure! Here is the summary you asked for.");
        match err {
            DocMetaError::ResponseParsing(msg) => {
                assert!(msg.starts_with("Invalid JSON response: "))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_field_fails() {
        assert_eq!(
            err_of(r#"{"summary": "s"}"#),
            parsing("Missing required fields in AI response")
        );
        assert_eq!(
            err_of(r#"{"tags": []}"#),
            parsing("Missing required fields in AI response")
        );
    }

    #[test]
    fn non_object_fails() {
        assert!(matches!(err_of(r#"["a", "b"]"#), DocMetaError::ResponseParsing(_)));
    }

    #[test]
    fn wrong_shapes_fail() {
        assert!(matches!(
            err_of(r#"{"summary": "s", "tags": 5}"#),
            DocMetaError::ResponseParsing(_)
        ));
        assert_eq!(
            err_of(r#"{"summary": "s", "tags": [{"name": "x"}]}"#),
            parsing("tags must contain only scalar values")
        );
        assert_eq!(
            err_of(r#"{"summary": "s", "tags": ["flu", ["nested"]]}"#),
            parsing("tags must contain only scalar values")
        );
        assert!(matches!(
            err_of(r#"{"summary": ["a"], "tags": []}"#),
            DocMetaError::ResponseParsing(_)
        ));
    }

    #[test]
    fn every_tag_is_clean() {
        let m = parse_reply(r#"{"summary": "s", "tags": ["  Type 2 Diabetes ", "x", "HbA1c"]}"#)
            .unwrap();
        for t in &m.tags {
            assert_eq!(t, &t.to_lowercase());
            assert!(!t.contains(' '));
            assert!(t.chars().count() > 1);
        }
        assert_eq!(m.tags, vec!["type_2_diabetes", "hba1c"]);
    }
}
