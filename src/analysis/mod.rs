//! Scoring domain types and the Gemini-backed analysis requester.
//!
//! - [`prompt`] - rubric text and prompt assembly
//! - [`gemini`] - the REST call to the scoring service and reply parsing
//!
//! [`AnalysisOutcome`] is the single value that flows between the
//! producer, the cache, and the gateway: either a scored result or a
//! structured error record. Its serialized form (tagged on `status`)
//! is exactly what the cache slot holds.

pub mod gemini;
pub mod prompt;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use gemini::{request_score, ScoreError};
pub use prompt::build_prompt;

/// Maximum achievable total score across the five rubric categories.
pub const MAX_TOTAL_SCORE: u32 = 50;

/// Structured reply of the scoring service.
///
/// All fields default when absent so a sparsely filled reply still
/// deserializes; range enforcement happens in the Gemini client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub total_score: u32,
    #[serde(default)]
    pub category_scores: BTreeMap<String, u32>,
    #[serde(default)]
    pub summary: String,
}

/// Failure classes a producer run can persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Feed-list endpoint or feed bodies unreachable
    UpstreamFetchFailure,
    /// Every feed failed; nothing to analyze
    AllFeedsFailure,
    /// Scoring service returned a service-level error
    ScoringServiceFailure,
    /// Scoring service replied with something that is not valid JSON
    ResponseParseFailure,
    /// Cache store unreachable
    CacheFailure,
}

/// Error payload persisted in place of a result when a run fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    /// Raw upstream text where it aids diagnosis (e.g. the unparsable
    /// scoring reply).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The single current value of the cache slot: one producer run's
/// definite outcome. Overwritten whole on each run, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Success(AnalysisResult),
    Error(ErrorRecord),
}

impl AnalysisOutcome {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error(ErrorRecord {
            kind,
            message: message.into(),
            detail: None,
        })
    }

    pub fn error_with_detail(
        kind: ErrorKind,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Error(ErrorRecord {
            kind,
            message: message.into(),
            detail: Some(detail.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_outcome_success_serializes_with_status_tag() {
        let outcome = AnalysisOutcome::Success(AnalysisResult {
            total_score: 37,
            category_scores: BTreeMap::from([("안전성".to_string(), 12)]),
            summary: "요약".to_string(),
        });

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["total_score"], 37);
        assert_eq!(value["category_scores"]["안전성"], 12);
    }

    #[test]
    fn test_outcome_error_round_trip() {
        let outcome = AnalysisOutcome::error_with_detail(
            ErrorKind::ResponseParseFailure,
            "reply was not JSON",
            "<html>oops</html>",
        );

        let text = serde_json::to_string(&outcome).unwrap();
        assert!(text.contains("\"status\":\"error\""));
        assert!(text.contains("response_parse_failure"));

        let back: AnalysisOutcome = serde_json::from_str(&text).unwrap();
        assert_eq!(back, outcome);
    }

    #[test]
    fn test_result_defaults_for_absent_fields() {
        let result: AnalysisResult = serde_json::from_str("{}").unwrap();
        assert_eq!(result.total_score, 0);
        assert!(result.category_scores.is_empty());
        assert_eq!(result.summary, "");
    }

    #[test]
    fn test_error_record_omits_empty_detail() {
        let outcome = AnalysisOutcome::error(ErrorKind::AllFeedsFailure, "no feeds");
        let text = serde_json::to_string(&outcome).unwrap();
        assert!(!text.contains("detail"));
    }
}
