use serde_json::{Map, Value};
use thiserror::Error;

use crate::db::models::QuestionResult;

/// Feedback stored whenever the oracle reply cannot be trusted.
pub(crate) const MANUAL_REVIEW_FEEDBACK: &str =
    "Автомат шалгалт амжилтгүй боллоо. Гараар шалгана уу.";

const SCORE_FIELDS: [&str; 3] = ["score", "marks_obtained", "total_score"];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradingResult {
    pub(crate) student_code: Option<String>,
    pub(crate) score: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) question_results: Vec<QuestionResult>,
    pub(crate) degraded: bool,
}

impl GradingResult {
    pub(crate) fn degraded() -> Self {
        Self {
            student_code: None,
            score: 0.0,
            feedback: Some(MANUAL_REVIEW_FEEDBACK.to_string()),
            question_results: Vec::new(),
            degraded: true,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum GradingOutputError {
    #[error("reply contains no JSON object")]
    NoJsonObject,
    #[error("score field `{0}` is not numeric")]
    NonNumericScore(&'static str),
    #[error("score {0} is negative or not finite")]
    InvalidScore(f64),
}

/// Returns the first balanced `{...}` span of `text` that parses as a JSON object.
///
/// Braces inside string literals are ignored, so prose, markdown fences and
/// stray braces around the payload do not confuse the scan.
pub(crate) fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    for (start, ch) in text.char_indices() {
        if ch != '{' {
            continue;
        }

        let Some(end) = balanced_end(&text[start..]) else {
            continue;
        };

        if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(&text[start..start + end])
        {
            return Some(object);
        }
    }

    None
}

/// Byte length of the balanced object starting at `fragment[0]`, if it closes.
fn balanced_end(fragment: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in fragment.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(offset + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

pub(crate) fn parse_grading_output(
    text: &str,
    total_points: i32,
) -> Result<GradingResult, GradingOutputError> {
    let object = extract_json_object(text).ok_or(GradingOutputError::NoJsonObject)?;

    let score = read_score(&object)?;
    let max_score = f64::from(total_points.max(0));
    let score = if score > max_score {
        tracing::debug!(score, max_score, "Clamping oracle score to exam total");
        max_score
    } else {
        score
    };

    let student_code = object.get("student_code").and_then(read_code);
    let feedback = object
        .get("feedback")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    Ok(GradingResult {
        student_code,
        score,
        feedback,
        question_results: read_question_results(object.get("question_results")),
        degraded: false,
    })
}

fn read_score(object: &Map<String, Value>) -> Result<f64, GradingOutputError> {
    let Some((field, value)) = SCORE_FIELDS
        .iter()
        .find_map(|field| object.get(*field).filter(|value| !value.is_null()).map(|v| (*field, v)))
    else {
        return Ok(0.0);
    };

    let score = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or(GradingOutputError::NonNumericScore(field))?;

    if !score.is_finite() || score < 0.0 {
        return Err(GradingOutputError::InvalidScore(score));
    }

    Ok(score)
}

fn read_code(value: &Value) -> Option<String> {
    let code = match value {
        Value::String(raw) => raw.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };

    (!code.is_empty()).then_some(code)
}

fn read_question_results(value: Option<&Value>) -> Vec<QuestionResult> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item.clone()) {
            Ok(result) => Some(result),
            Err(err) => {
                tracing::warn!(index, error = %err, "Skipping malformed question result");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_object_wrapped_in_prose_and_fences() {
        let reply = "Here is the grading:\n```json\n{\"score\": 8, \"student_code\": \"852\"}\n```\nDone.";

        let object = extract_json_object(reply).expect("object");

        assert_eq!(object.get("score"), Some(&Value::from(8)));
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let reply = r#"{"feedback": "use {x} and \"}\" carefully", "score": 3}"#;

        let object = extract_json_object(reply).expect("object");

        assert_eq!(object.get("score"), Some(&Value::from(3)));
        assert_eq!(
            object.get("feedback").and_then(Value::as_str),
            Some("use {x} and \"}\" carefully")
        );
    }

    #[test]
    fn skips_unparseable_candidates() {
        let reply = "set {a, b} then {\"score\": 5}";

        let object = extract_json_object(reply).expect("object");

        assert_eq!(object.get("score"), Some(&Value::from(5)));
    }

    #[test]
    fn no_object_is_reported() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("{\"score\": 5").is_none());
        assert_eq!(parse_grading_output("[1, 2]", 10), Err(GradingOutputError::NoJsonObject));
    }

    #[test]
    fn parses_canonical_reply() {
        let reply = r#"{
            "student_code": " 852 ",
            "score": 8,
            "feedback": "Сайн",
            "question_results": [
                {"question_number": 1, "points_awarded": 8, "max_points": 10, "is_correct": false, "feedback": "Алдаа"}
            ]
        }"#;

        let result = parse_grading_output(reply, 10).expect("result");

        assert_eq!(result.student_code.as_deref(), Some("852"));
        assert_eq!(result.score, 8.0);
        assert_eq!(result.feedback.as_deref(), Some("Сайн"));
        assert_eq!(result.question_results.len(), 1);
        assert_eq!(result.question_results[0].max_points, 10.0);
        assert!(!result.degraded);
    }

    #[test]
    fn accepts_alternate_field_names() {
        let reply = r#"{
            "student_code": 852,
            "marks_obtained": "7.5",
            "question_results": [
                {"question": 1, "marks_awarded": 4.5, "max_marks": 5},
                {"question_number": 2, "points": 3, "max_points": 5, "is_correct": true}
            ]
        }"#;

        let result = parse_grading_output(reply, 10).expect("result");

        assert_eq!(result.student_code.as_deref(), Some("852"));
        assert_eq!(result.score, 7.5);
        assert_eq!(result.question_results[0].points_awarded, 4.5);
        assert_eq!(result.question_results[1].points_awarded, 3.0);
        assert!(result.question_results[1].is_correct);
        assert!(result.feedback.is_none());
    }

    #[test]
    fn malformed_question_items_are_dropped() {
        let reply = r#"{"score": 4, "question_results": [
            {"question_number": 1, "points_awarded": 4, "max_points": 5},
            "not an object",
            {"question_number": "two", "points_awarded": 1, "max_points": 5}
        ]}"#;

        let result = parse_grading_output(reply, 10).expect("result");

        assert_eq!(result.question_results.len(), 1);
        assert_eq!(result.question_results[0].question_number, 1);
    }

    #[test]
    fn missing_score_counts_as_zero() {
        let result = parse_grading_output(r#"{"student_code": null}"#, 10).expect("result");

        assert_eq!(result.score, 0.0);
        assert!(result.student_code.is_none());
    }

    #[test]
    fn invalid_scores_are_rejected() {
        assert_eq!(
            parse_grading_output(r#"{"score": -1}"#, 10),
            Err(GradingOutputError::InvalidScore(-1.0))
        );
        assert_eq!(
            parse_grading_output(r#"{"score": "eight"}"#, 10),
            Err(GradingOutputError::NonNumericScore("score"))
        );
        assert!(parse_grading_output(r#"{"total_score": "NaN"}"#, 10).is_err());
    }

    #[test]
    fn score_above_total_is_clamped() {
        let result = parse_grading_output(r#"{"score": 14}"#, 10).expect("result");

        assert_eq!(result.score, 10.0);
    }

    #[test]
    fn degraded_result_carries_manual_review_feedback() {
        let result = GradingResult::degraded();

        assert!(result.degraded);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.feedback.as_deref(), Some(MANUAL_REVIEW_FEEDBACK));
        assert!(result.question_results.is_empty());
    }
}
