//! HTTP Tool Service
//!
//! JSON-RPC 2.0 over HTTP against an MCP-style tool server (`tools/list`,
//! `tools/call`). Each request stands alone: no session is kept between
//! calls. Servers may answer with plain JSON or a single SSE event stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    tool::{ToolSchema, ToolService},
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::probe::ProbeTarget;

/// Tool server configuration
#[derive(Clone, Debug)]
pub struct HttpToolServiceConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl HttpToolServiceConfig {
    /// Read `SOCIAL_MCP_URL` and `SOCIAL_API_KEY`
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("SOCIAL_MCP_URL").unwrap_or_else(|_| "https://lunarcrush.ai/mcp".into()),
            api_key: std::env::var("SOCIAL_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            timeout_secs: 30,
        }
    }
}

/// Tool service reached over HTTP
pub struct HttpToolService {
    client: reqwest::Client,
    config: HttpToolServiceConfig,
    request_id: AtomicU64,
}

impl HttpToolService {
    pub fn new(config: HttpToolServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            request_id: AtomicU64::new(0),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(HttpToolServiceConfig::from_env())
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Probe for the diagnostics endpoint
    pub fn probe_target(&self) -> ProbeTarget {
        let mut target = ProbeTarget::post(
            "tools",
            &self.config.url,
            rpc_envelope(0, "tools/list", json!({})),
        )
        .header("Accept", "application/json, text/event-stream");
        if let Some(key) = &self.config.api_key {
            target = target.header("Authorization", format!("Bearer {key}"));
        }
        target
    }

    /// Send a JSON-RPC request and return its `result`
    async fn send_request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(url = %self.config.url, method, id, "Sending tool service request");

        let mut request = self
            .client
            .post(&self.config.url)
            .header("Accept", "application/json, text/event-stream")
            .json(&rpc_envelope(id, method, params));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AgentError::ToolService(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let is_sse = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/event-stream"));
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::ToolService(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => AgentError::Auth(format!("tool service rejected credentials: {body}")),
                429 => AgentError::RateLimited(body),
                _ => AgentError::ToolService(format!("HTTP {status} for {method}: {body}")),
            });
        }

        let envelope = if is_sse {
            parse_sse_payload(&body)
                .ok_or_else(|| AgentError::ToolService(format!("No JSON-RPC message in event stream for {method}")))?
        } else {
            serde_json::from_str(&body)
                .map_err(|e| AgentError::ToolService(format!("Failed to parse response: {e}")))?
        };

        unwrap_rpc(method, envelope)
    }
}

#[async_trait]
impl ToolService for HttpToolService {
    fn name(&self) -> &str {
        "http-mcp"
    }

    async fn list_tools(&self) -> Result<Vec<ToolSchema>> {
        let result = self.send_request("tools/list", json!({})).await?;
        let tools = result.get("tools").cloned().unwrap_or_else(|| json!([]));
        Ok(serde_json::from_value(tools)?)
    }

    async fn call_tool(&self, name: &str, args: &Map<String, Value>) -> Result<Value> {
        let result = self
            .send_request("tools/call", json!({"name": name, "arguments": args}))
            .await?;

        if result.get("isError").and_then(Value::as_bool) == Some(true) {
            return Err(AgentError::ToolService(content_text(&result)));
        }
        Ok(result)
    }
}

fn rpc_envelope(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Split a JSON-RPC response into its result or error
fn unwrap_rpc(method: &str, envelope: Value) -> Result<Value> {
    if let Some(error) = envelope.get("error") {
        let message = error.get("message").and_then(Value::as_str).unwrap_or("unknown error");
        return Err(AgentError::ToolService(format!("{method}: {message}")));
    }
    envelope
        .get("result")
        .cloned()
        .ok_or_else(|| AgentError::ToolService(format!("No result in response to {method}")))
}

/// First `data:` line of an SSE body that holds a JSON-RPC response
fn parse_sse_payload(body: &str) -> Option<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .filter_map(|data| serde_json::from_str::<Value>(data.trim()).ok())
        .find(|v| v.get("result").is_some() || v.get("error").is_some())
}

fn content_text(result: &Value) -> String {
    result
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Tool reported an error".into())
}
