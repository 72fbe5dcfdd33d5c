//! Tool System
//!
//! Types exchanged with a remote tool service. Tools are discovered at
//! request time, planned by the LLM, and executed by the orchestrator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Tool call planned by the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub tool: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub args: Map<String, Value>,

    /// Why the model wants this call
    #[serde(default)]
    pub reason: String,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args: Map::new(),
            reason: String::new(),
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// Outcome of one tool call
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    pub args: Map<String, Value>,
    pub reason: String,

    /// Whether execution succeeded
    pub success: bool,

    /// Raw payload from the tool service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error text when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(call: &ToolCall, result: Value) -> Self {
        Self {
            tool: call.tool.clone(),
            args: call.args.clone(),
            reason: call.reason.clone(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(call: &ToolCall, error: impl Into<String>) -> Self {
        Self {
            tool: call.tool.clone(),
            args: call.args.clone(),
            reason: call.reason.clone(),
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Render for inclusion in a synthesis prompt
    pub fn render_for_prompt(&self) -> String {
        let args = Value::Object(self.args.clone());
        match (&self.result, &self.error) {
            (Some(result), _) if self.success => {
                format!("[Tool '{}' {} returned]\n{}", self.tool, args, render_payload(result))
            }
            (_, Some(error)) => format!("[Tool '{}' {} failed]\n{}", self.tool, args, error),
            _ => format!("[Tool '{}' {} returned nothing]", self.tool, args),
        }
    }
}

/// MCP-style results wrap text in `{"content": [{"type": "text", "text": ...}]}`;
/// unwrap that so the model sees the text rather than escaped JSON.
fn render_payload(value: &Value) -> String {
    if let Some(blocks) = value.get("content").and_then(Value::as_array) {
        let texts: Vec<&str> = blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect();
        if !texts.is_empty() {
            return texts.join("\n");
        }
    }
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Tool definition as advertised by the tool service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the LLM)
    #[serde(default)]
    pub description: String,

    /// JSON Schema for the arguments
    #[serde(default, rename = "inputSchema", alias = "input_schema")]
    pub input_schema: Value,
}

/// Remote service offering callable tools (Strategy pattern)
#[async_trait]
pub trait ToolService: Send + Sync {
    /// Service name for logs and diagnostics
    fn name(&self) -> &str;

    /// Discover callable tools and their schemas
    async fn list_tools(&self) -> Result<Vec<ToolSchema>>;

    /// Invoke a tool with the given arguments
    async fn call_tool(&self, name: &str, args: &Map<String, Value>) -> Result<Value>;

    /// Check if the service is reachable
    async fn health_check(&self) -> bool {
        self.list_tools().await.is_ok()
    }
}

/// Generate prompt section describing available tools
pub fn describe_tools(tools: &[ToolSchema]) -> String {
    let mut prompt = String::from("## Available Tools\n\n");

    for schema in tools {
        prompt.push_str(&format!("### {}\n", schema.name));
        if !schema.description.is_empty() {
            prompt.push_str(&format!("{}\n", schema.description));
        }

        if let Some(props) = schema.input_schema.get("properties").and_then(Value::as_object) {
            let required: Vec<&str> = schema
                .input_schema
                .get("required")
                .and_then(Value::as_array)
                .map(|r| r.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();

            prompt.push_str("**Parameters:**\n");
            for (name, prop) in props {
                let ty = prop.get("type").and_then(Value::as_str).unwrap_or("any");
                let desc = prop.get("description").and_then(Value::as_str).unwrap_or("");
                let marker = if required.contains(&name.as_str()) { " (required)" } else { "" };
                prompt.push_str(&format!("- `{name}` ({ty}){marker}: {desc}\n"));
            }
        }
        prompt.push('\n');
    }

    prompt
}
