//! Test doubles for the LLM and the social-data tool service.

use std::collections::VecDeque;
use std::sync::Mutex;

use agent_core::{
    provider::{Completion, GenerationOptions, ModelInfo},
    AgentError, LlmProvider, Message, Result, ToolSchema, ToolService,
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

/// Replays canned completions in order; errors once exhausted
pub struct FakeLlm {
    replies: Mutex<VecDeque<String>>,
}

impl FakeLlm {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| (*r).to_string()).collect()),
        }
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    fn name(&self) -> &str {
        "fake"
    }

    fn default_model(&self) -> &str {
        "fake-model"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(&self, _messages: &[Message], options: &GenerationOptions) -> Result<Completion> {
        let reply = self
            .replies
            .lock()
            .map_err(|_| AgentError::Other("poisoned".into()))?
            .pop_front()
            .ok_or_else(|| AgentError::ProviderUnavailable("no scripted reply left".into()))?;
        Ok(Completion::text(reply, &options.model))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(Vec::new())
    }
}

/// Social-data tool server with fixed answers
#[derive(Default)]
pub struct FakeSocialTools {
    failing: Option<String>,
    unreachable: bool,
}

impl FakeSocialTools {
    /// Calls to `tool` fail with an HTTP 500
    pub fn with_failing(tool: &str) -> Self {
        Self {
            failing: Some(tool.to_string()),
            unreachable: false,
        }
    }

    /// Discovery itself fails
    pub fn unreachable() -> Self {
        Self {
            failing: None,
            unreachable: true,
        }
    }
}

#[async_trait]
impl ToolService for FakeSocialTools {
    fn name(&self) -> &str {
        "fake-social"
    }

    async fn list_tools(&self) -> Result<Vec<ToolSchema>> {
        if self.unreachable {
            return Err(AgentError::ToolService("connection refused".into()));
        }
        Ok(["Topic", "Topic_Time_Series", "Cryptocurrencies"]
            .iter()
            .map(|name| ToolSchema {
                name: (*name).to_string(),
                description: format!("{name} data"),
                input_schema: json!({
                    "type": "object",
                    "properties": {"topic": {"type": "string"}},
                    "required": ["topic"]
                }),
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, args: &Map<String, Value>) -> Result<Value> {
        if self.failing.as_deref() == Some(name) {
            return Err(AgentError::ToolService("HTTP 500".into()));
        }
        Ok(json!({
            "content": [{"type": "text", "text": format!("Data for {}", args.get("topic").and_then(Value::as_str).unwrap_or("?"))}],
            "structuredContent": {
                "price": 97500,
                "percent_change_24h": 1.8,
                "galaxy_score": 71,
                "alt_rank": 4
            }
        }))
    }
}
