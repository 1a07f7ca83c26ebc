//! The per-request read path: authenticate, route, serve the cache.
//!
//! One catch-all handler mirrors the original serverless entry point:
//! every path and method lands here, auth runs before routing, and the
//! permissive CORS layer wraps all responses including errors.

use crate::analysis::AnalysisOutcome;
use crate::config::Config;
use crate::producer;
use crate::storage::{AnalysisCache, CacheError};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};

const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Shown on the consumer route before the first producer run completes.
const PENDING_MESSAGE: &str = "아직 분석 결과가 준비되지 않았습니다. 잠시 후 다시 시도해 주세요.";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    /// No credential in query string or bearer header
    #[error("인증 정보가 없습니다.")]
    AuthMissing,
    /// Credential present but does not match the configured secret
    #[error("API 키가 유효하지 않습니다.")]
    AuthInvalid,
    /// Unknown path; echoes what was received for diagnostics
    #[error("정의되지 않은 API 경로입니다: {0}")]
    RouteNotFound(String),
    #[error("캐시 저장소 오류: {0}")]
    Cache(#[from] CacheError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthMissing => StatusCode::UNAUTHORIZED,
            ApiError::AuthInvalid => StatusCode::FORBIDDEN,
            ApiError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "status": "error",
            "message": self.to_string(),
        });
        if let ApiError::RouteNotFound(path) = &self {
            body["requested_path"] = Value::String(path.clone());
        }
        json_response(self.status(), &body)
    }
}

// ============================================================================
// State & Router
// ============================================================================

/// Shared per-process state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: AnalysisCache,
    pub client: reqwest::Client,
}

/// Builds the service router: a single catch-all handler plus the
/// allow-all CORS layer, so success and failure responses alike carry
/// the cross-origin headers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// ============================================================================
// Handler
// ============================================================================

async fn dispatch(
    State(state): State<AppState>,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let path = normalize_path(uri.path());

    // Health probe sits outside the keyed engine, as in the original
    // split deployment — no credential required.
    if matches!(path.as_str(), "health" | "api/health") {
        return Ok(health_response());
    }

    authenticate(&state.config, &params, &headers)?;

    match path.as_str() {
        "collect" | "api/collect" => serve_cached(&state).await,
        "cron" | "api/cron" => {
            tracing::info!("Cron route triggered, running producer synchronously");
            let outcome = producer::run(&state.config, &state.client, &state.cache).await;
            Ok(outcome_response(&state.config, &outcome))
        }
        _ => {
            tracing::debug!(path = %path, "Unknown route");
            Err(ApiError::RouteNotFound(path))
        }
    }
}

/// Trim surrounding whitespace and slashes; nothing more. `collect`
/// and `api/collect` being equivalent is handled at the match site —
/// deliberately lenient routing, no case folding.
fn normalize_path(path: &str) -> String {
    path.trim().trim_matches('/').trim().to_string()
}

/// Credential extraction: `?api_key=` wins over the bearer header.
/// Missing and invalid are distinct failures (401 vs 403).
fn authenticate(
    config: &Config,
    params: &HashMap<String, String>,
    headers: &HeaderMap,
) -> Result<(), ApiError> {
    let presented = params
        .get("api_key")
        .map(|v| v.as_str())
        .or_else(|| bearer_token(headers))
        .ok_or(ApiError::AuthMissing)?;

    if presented != config.engine_api_key.expose_secret() {
        return Err(ApiError::AuthInvalid);
    }
    Ok(())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn serve_cached(state: &AppState) -> Result<Response, ApiError> {
    match state.cache.get().await? {
        None => Ok(json_response(
            StatusCode::OK,
            &json!({
                "status": "pending",
                "briefing_summary": PENDING_MESSAGE,
            }),
        )),
        Some(outcome) => Ok(outcome_response(&state.config, &outcome)),
    }
}

/// Maps a cached (or freshly produced) outcome onto the response
/// envelope: success → 200 with the public fields, persisted error
/// record → 500 surfacing the record.
fn outcome_response(config: &Config, outcome: &AnalysisOutcome) -> Response {
    match outcome {
        AnalysisOutcome::Success(result) => json_response(
            StatusCode::OK,
            &json!({
                "status": "success",
                "public_index": result.total_score,
                "category_scores": result.category_scores,
                "briefing_summary": result.summary,
                "ai_key_test_gemini": gemini_key_status(config),
            }),
        ),
        AnalysisOutcome::Error(record) => {
            let mut body = json!({
                "status": "error",
                "error": record.kind,
                "message": record.message,
            });
            if let Some(detail) = &record.detail {
                body["detail"] = Value::String(detail.clone());
            }
            json_response(StatusCode::INTERNAL_SERVER_ERROR, &body)
        }
    }
}

fn gemini_key_status(config: &Config) -> &'static str {
    if config.gemini_api_key.is_some() {
        "로드됨"
    } else {
        "로드 안됨"
    }
}

fn health_response() -> Response {
    json_response(
        StatusCode::OK,
        &json!({
            "ok": true,
            "service": "ribbonline-engine",
            "time": chrono::Utc::now().to_rfc3339(),
        }),
    )
}

fn json_response(status: StatusCode, body: &Value) -> Response {
    let text = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    (
        status,
        [(header::CONTENT_TYPE, CONTENT_TYPE_JSON)],
        text,
    )
        .into_response()
}

// ============================================================================
// Tests
// ============================================================================
