//! Sentiment Advisor HTTP Server
//!
//! Axum server behind the voice UI: query analysis, speech synthesis with a
//! browser fallback, and raw vendor diagnostics.

mod handlers;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::{get, post}, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{LlmProvider, ToolService};
use agent_runtime::{llm_from_env, HttpToolService};
use agent_speech::SpeechSynthesizer;
use sentiment_advisor::{AdvisorSettings, SentimentAdvisor};

use crate::handlers::{analyze, diagnostic, diagnostics, health_check, speech};
use crate::state::{AppState, Probes};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the router
fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/analyze", post(analyze))
        .route("/api/speech", post(speech))
        .route("/api/diagnostics", get(diagnostics))
        .route("/api/diagnostics/{target}", get(diagnostic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before reading RUST_LOG
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // LLM provider
    let llm = llm_from_env()?;
    match llm.provider.health_check().await {
        Ok(true) => {
            tracing::info!("✓ Connected to LLM provider '{}'", llm.provider.name());
            if let Ok(models) = llm.provider.list_models().await {
                tracing::info!("  {} models available, using '{}'", models.len(), llm.provider.default_model());
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ LLM provider '{}' not reachable - analysis will fail", llm.provider.name());
            tracing::warn!("  Check LLM_PROVIDER / LLM_API_KEY, or run: ollama serve");
        }
    }

    // Social-data tool service
    let tools = HttpToolService::from_env()?;
    if !tools.is_configured() {
        tracing::warn!("⚠ SOCIAL_API_KEY not set - tool calls will likely be rejected");
    }
    let tool_probe = tools.probe_target();
    let tools: Arc<dyn ToolService> = Arc::new(tools);
    match tools.list_tools().await {
        Ok(schemas) => {
            tracing::info!("✓ Tool service offers {} tools:", schemas.len());
            for schema in &schemas {
                tracing::info!("  • {}", schema.name);
            }
        }
        Err(e) => tracing::warn!("⚠ Tool discovery failed: {}", e),
    }

    let settings = AdvisorSettings::from_env()?;
    let advisor = SentimentAdvisor::new(llm.provider, tools, &settings);

    // Speech vendor
    let speech = SpeechSynthesizer::from_env()?;
    if speech.is_configured() {
        tracing::info!("✓ Speech vendor configured");
    } else {
        tracing::warn!("⚠ TTS_API_KEY not set - clients will use browser speech");
    }

    let state = AppState::new(
        advisor,
        speech,
        Probes::new(llm.probe, tool_probe, PROBE_TIMEOUT),
    );

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 sentiment advisor running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                   - Health check");
    tracing::info!("  POST /api/analyze              - Analyze a query");
    tracing::info!("  POST /api/speech               - Text to speech");
    tracing::info!("  GET  /api/diagnostics          - Probe all vendors");
    tracing::info!("  GET  /api/diagnostics/{{target}} - Probe llm | tools | speech");
    tracing::info!("");

    axum::serve(listener, app(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_runtime::ProbeTarget;
    use agent_speech::SpeechConfig;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use sentiment_advisor::testing::{FakeLlm, FakeSocialTools};
    use serde_json::Value;
    use tower::ServiceExt;

    fn state(replies: &[&str], tools: FakeSocialTools) -> AppState {
        let advisor = SentimentAdvisor::new(
            Arc::new(FakeLlm::new(replies)),
            Arc::new(tools),
            &AdvisorSettings::default(),
        );
        let speech = SpeechSynthesizer::new(SpeechConfig::default()).unwrap();
        let probes = Probes::new(
            ProbeTarget::get("llm", "http://127.0.0.1:9/api/tags"),
            ProbeTarget::get("tools", "http://127.0.0.1:9/mcp"),
            Duration::from_millis(200),
        );
        AppState::new(advisor, speech, probes)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let plan = r#"[{"tool": "Topic", "args": {"topic": "ethereum"}, "reason": "social"}]"#;
        let synthesis = r#"{"recommendation": "BUY", "confidence": 0.8, "sentiment": "bullish",
            "reasoning": "Mentions are climbing.", "spoken_text": "Ethereum looks strong."}"#;
        let app = app(state(&[plan, synthesis], FakeSocialTools::default()));

        let (status, body) = send(app, "POST", "/api/analyze", Some(r#"{"query": "Should I buy ETH?"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "eth");
        assert_eq!(body["recommendation"], "BUY");
        assert_eq!(body["confidence"], 80);
        assert_eq!(body["metrics"]["market_cap"], "N/A");
        assert_eq!(body["spoken_text"], "Ethereum looks strong.");
    }

    #[tokio::test]
    async fn test_analyze_empty_query_is_400_with_fallback() {
        let app = app(state(&[], FakeSocialTools::default()));
        let (status, body) = send(app, "POST", "/api/analyze", Some(r#"{"query": "  "}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "EMPTY_QUERY");
        assert_eq!(body["spoken_text"], sentiment_advisor::FALLBACK_SPOKEN_MESSAGE);
    }

    #[tokio::test]
    async fn test_analyze_pipeline_failure_is_502() {
        let app = app(state(&["[]", "ok"], FakeSocialTools::unreachable()));
        let (status, body) = send(app, "POST", "/api/analyze", Some(r#"{"query": "sol?"}"#)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "ANALYSIS_FAILED");
        assert_eq!(body["spoken_text"], sentiment_advisor::FALLBACK_SPOKEN_MESSAGE);
    }

    #[tokio::test]
    async fn test_speech_without_credentials_flags_fallback() {
        let app = app(state(&[], FakeSocialTools::default()));
        let (status, body) = send(app, "POST", "/api/speech", Some(r#"{"text": "Hold **BTC**."}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["use_local_fallback"], true);
        assert_eq!(body["text"], "Hold BTC.");
        assert!(body.get("audio_base64").is_none());
    }

    #[tokio::test]
    async fn test_speech_empty_text_is_400() {
        let app = app(state(&[], FakeSocialTools::default()));
        let (status, body) = send(app, "POST", "/api/speech", Some(r#"{"text": ""}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "EMPTY_TEXT");
        assert_eq!(body["use_local_fallback"], false);
    }

    #[tokio::test]
    async fn test_speech_diagnostic_unconfigured() {
        let app = app(state(&[], FakeSocialTools::default()));
        let (status, body) = send(app, "GET", "/api/diagnostics/speech", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "speech");
        assert_eq!(body["configured"], false);
    }

    #[tokio::test]
    async fn test_unknown_diagnostic_target() {
        let app = app(state(&[], FakeSocialTools::default()));
        let (status, body) = send(app, "GET", "/api/diagnostics/database", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "UNKNOWN_TARGET");
    }

    #[tokio::test]
    async fn test_health_reports_components() {
        let app = app(state(&[], FakeSocialTools::default()));
        let (status, body) = send(app, "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["llm_provider"], "fake");
        assert_eq!(body["tools_connected"], true);
        assert_eq!(body["speech_configured"], false);
    }
}
