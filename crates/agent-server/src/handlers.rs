//! HTTP Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use agent_core::{LlmProvider, ToolService};
use agent_runtime::ProbeReport;
use agent_speech::{SpeechError, SpeechRequest, SpeechResponse};
use sentiment_advisor::{AnalysisResponse, ErrorResponse, FALLBACK_SPOKEN_MESSAGE};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub llm_provider: String,
    pub llm_connected: bool,
    pub tool_service: String,
    pub tools_connected: bool,
    pub speech_configured: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub query: String,
}

/// Speech failure; the client may still speak `text` itself
#[derive(Debug, Serialize)]
pub struct SpeechErrorResponse {
    pub error: String,
    pub code: String,
    pub use_local_fallback: bool,
    pub text: String,
}

/// One diagnostics entry
#[derive(Serialize)]
#[serde(untagged)]
pub enum Diagnostic {
    Probed(ProbeReport),
    Skipped {
        name: &'static str,
        configured: bool,
        message: &'static str,
    },
}

#[derive(Serialize)]
pub struct DiagnosticsResponse {
    pub llm: Diagnostic,
    pub tools: Diagnostic,
    pub speech: Diagnostic,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider = state.advisor.provider();
    let tools = state.advisor.tool_service();

    let llm_connected = provider.health_check().await.unwrap_or(false);
    let tools_connected = tools.health_check().await;

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        llm_provider: provider.name().to_string(),
        llm_connected,
        tool_service: tools.name().to_string(),
        tools_connected,
        speech_configured: state.speech.is_configured(),
    })
}

/// Run the full analysis pipeline for one query
pub async fn analyze(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, (StatusCode, Json<ErrorResponse>)> {
    let response = state.advisor.analyze(&payload.query).await.map_err(|e| {
        let status = if e.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!("Analysis error: {}", e);
            StatusCode::BAD_GATEWAY
        };
        (
            status,
            Json(ErrorResponse {
                error: e.user_message(),
                code: e.code().into(),
                spoken_text: FALLBACK_SPOKEN_MESSAGE.into(),
            }),
        )
    })?;

    Ok(Json(response))
}

/// Render text as audio, or tell the client to speak it locally
pub async fn speech(
    State(state): State<AppState>,
    Json(payload): Json<SpeechRequest>,
) -> Result<Json<SpeechResponse>, (StatusCode, Json<SpeechErrorResponse>)> {
    let text = payload.text.clone();

    state.speech.synthesize(payload).await.map(Json).map_err(|e| {
        let status = match e {
            SpeechError::EmptyText => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        (
            status,
            Json(SpeechErrorResponse {
                error: e.to_string(),
                code: e.code().into(),
                use_local_fallback: e.allows_local_fallback(),
                text,
            }),
        )
    })
}

/// Probe every vendor
pub async fn diagnostics(State(state): State<AppState>) -> Json<DiagnosticsResponse> {
    Json(DiagnosticsResponse {
        llm: Diagnostic::Probed(state.probes.run(&state.probes.llm).await),
        tools: Diagnostic::Probed(state.probes.run(&state.probes.tools).await),
        speech: speech_diagnostic(&state).await,
    })
}

/// Probe a single vendor: `llm`, `tools` or `speech`
pub async fn diagnostic(State(state): State<AppState>, Path(target): Path<String>) -> Response {
    match target.as_str() {
        "llm" => Json(Diagnostic::Probed(state.probes.run(&state.probes.llm).await)).into_response(),
        "tools" => Json(Diagnostic::Probed(state.probes.run(&state.probes.tools).await)).into_response(),
        "speech" => Json(speech_diagnostic(&state).await).into_response(),
        other => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": format!("Unknown diagnostics target '{other}'"),
                "code": "UNKNOWN_TARGET",
            })),
        )
            .into_response(),
    }
}

async fn speech_diagnostic(state: &AppState) -> Diagnostic {
    match state.speech.probe_target() {
        Some(target) => Diagnostic::Probed(state.probes.run(&target).await),
        None => Diagnostic::Skipped {
            name: "speech",
            configured: false,
            message: "TTS_API_KEY not set; clients use browser speech",
        },
    }
}
