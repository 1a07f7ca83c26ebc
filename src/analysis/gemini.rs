use crate::analysis::{prompt, AnalysisResult, MAX_TOTAL_SCORE};
use crate::config::Config;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Whole-request timeout for one scoring call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ScoreError {
    /// GEMINI_API_KEY is not configured
    #[error("Scoring credential not configured")]
    NoCredential,
    #[error("Scoring request timed out")]
    Timeout,
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Service-level error; carries the service's diagnostic message
    #[error("Scoring service error (status {status}): {message}")]
    Service { status: u16, message: String },
    /// Reply body arrived but the candidate text is not valid JSON
    #[error("Scoring reply is not valid JSON")]
    MalformedReply { raw: String },
    /// Reply had no candidates or an empty candidate
    #[error("Scoring reply contained no content")]
    EmptyReply,
}

// Wire shapes of the generateContent reply. Only the fields we read.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Sends one scoring request and parses the JSON reply.
///
/// Builds the user prompt from the collected summaries, asks the model
/// for a JSON-only reply (`response_mime_type`), and deserializes the
/// first candidate's text as [`AnalysisResult`]. Out-of-range totals
/// are clamped to the 50-point rubric maximum.
///
/// # Errors
///
/// - [`ScoreError::NoCredential`] - no Gemini key configured
/// - [`ScoreError::Service`] - non-2xx reply; message extracted from
///   the service's error body when present
/// - [`ScoreError::MalformedReply`] - candidate text was not valid
///   JSON; the raw text is attached for the persisted error record
/// - [`ScoreError::EmptyReply`] - structurally valid reply without any
///   candidate text
pub async fn request_score(
    client: &reqwest::Client,
    config: &Config,
    summaries: &[String],
) -> Result<AnalysisResult, ScoreError> {
    let api_key = config
        .gemini_api_key
        .as_ref()
        .ok_or(ScoreError::NoCredential)?;

    let url = format!(
        "{}/v1beta/models/{}:generateContent",
        config.gemini_base_url, config.gemini_model
    );

    let body = json!({
        "systemInstruction": {
            "parts": [{ "text": prompt::SYSTEM_INSTRUCTION }]
        },
        "contents": [{
            "parts": [{ "text": prompt::build_prompt(summaries) }]
        }],
        "generationConfig": {
            "response_mime_type": "application/json"
        }
    });

    let response = tokio::time::timeout(
        REQUEST_TIMEOUT,
        client
            .post(&url)
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&body)
            .send(),
    )
    .await
    .map_err(|_| ScoreError::Timeout)?
    .map_err(ScoreError::Network)?;

    let status = response.status();
    let text = tokio::time::timeout(REQUEST_TIMEOUT, response.text())
        .await
        .map_err(|_| ScoreError::Timeout)?
        .map_err(ScoreError::Network)?;

    if !status.is_success() {
        // Prefer the service's own diagnostic message over the raw body
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .ok()
            .and_then(|e| e.error)
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or(text);
        return Err(ScoreError::Service {
            status: status.as_u16(),
            message,
        });
    }

    let reply: GenerateResponse =
        serde_json::from_str(&text).map_err(|_| ScoreError::MalformedReply { raw: text.clone() })?;

    let candidate_text = reply
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .map(|p| p.text)
        .filter(|t| !t.trim().is_empty())
        .ok_or(ScoreError::EmptyReply)?;

    let mut result: AnalysisResult = serde_json::from_str(candidate_text.trim()).map_err(|_| {
        ScoreError::MalformedReply {
            raw: candidate_text.clone(),
        }
    })?;

    if result.total_score > MAX_TOTAL_SCORE {
        tracing::warn!(
            total_score = result.total_score,
            "Scoring reply exceeded the rubric maximum, clamping"
        );
        result.total_score = MAX_TOTAL_SCORE;
    }

    tracing::info!(
        total_score = result.total_score,
        categories = result.category_scores.len(),
        "Scoring reply parsed"
    );
    Ok(result)
}
