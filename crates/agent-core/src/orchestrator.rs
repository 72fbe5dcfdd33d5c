//! Two-Pass Tool Orchestration
//!
//! The model first plans which tools to call, the calls are executed one at a
//! time against the tool service, then the model synthesizes an answer from
//! the collected results. Linear, single pass, no retries.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::extract::parse_tool_plan;
use crate::message::Message;
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{describe_tools, ToolCall, ToolResult, ToolSchema, ToolService};

/// Orchestrator configuration
///
/// Prompt templates use `{tools}`, `{subject}`, `{query}`, `{max_calls}` and
/// `{results}` placeholders.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// System prompt for the planning pass
    pub planning_prompt: String,

    /// System prompt for the synthesis pass
    pub synthesis_prompt: String,

    /// Upper bound on planned tool calls
    pub max_tool_calls: usize,

    /// Time budget for each tool call
    pub tool_timeout: Duration,

    /// Generation options for the planning pass
    pub planning: GenerationOptions,

    /// Generation options for the synthesis pass
    pub synthesis: GenerationOptions,

    /// Tool called when the plan cannot be parsed
    pub fallback_tool: String,

    /// Argument of `fallback_tool` that receives the subject
    pub fallback_argument: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            planning_prompt: DEFAULT_PLANNING_PROMPT.into(),
            synthesis_prompt: DEFAULT_SYNTHESIS_PROMPT.into(),
            max_tool_calls: 4,
            tool_timeout: Duration::from_secs(20),
            // Blank model names defer to the provider's default model
            planning: GenerationOptions {
                model: String::new(),
                temperature: 0.1,
                json_mode: true,
                ..Default::default()
            },
            synthesis: GenerationOptions::with_model(""),
            fallback_tool: "search".into(),
            fallback_argument: "query".into(),
        }
    }
}

const DEFAULT_PLANNING_PROMPT: &str = r#"You decide which tools to call to answer a question about {subject}.

{tools}
Respond ONLY with a JSON array of at most {max_calls} objects:
[{"tool": "tool_name", "args": {"arg": "value"}, "reason": "why"}]"#;

const DEFAULT_SYNTHESIS_PROMPT: &str = r#"Answer the user's question about {subject} using these tool results.

{results}"#;

/// A planned set of calls
#[derive(Clone, Debug)]
pub struct Plan {
    pub calls: Vec<ToolCall>,

    /// True when the model output was unusable and the fallback call was substituted
    pub fallback: bool,
}

/// Everything one orchestration run produced
#[derive(Clone, Debug)]
pub struct Orchestration {
    pub subject: String,
    pub plan: Plan,
    pub results: Vec<ToolResult>,
    pub analysis: String,
}

impl Orchestration {
    /// Results of calls that failed
    pub fn failures(&self) -> impl Iterator<Item = &ToolResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// Plans, executes and synthesizes over a tool service
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<dyn ToolService>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<dyn ToolService>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Run the full plan → execute → synthesize sequence
    pub async fn run(&self, query: &str, subject: &str) -> Result<Orchestration> {
        let schemas = self.tools.list_tools().await?;
        tracing::debug!(service = self.tools.name(), count = schemas.len(), "Discovered tools");

        let plan = self.plan(query, subject, &schemas).await?;
        let results = self.execute(&plan.calls, &schemas).await;
        let analysis = self.synthesize(query, subject, &results).await?;

        Ok(Orchestration {
            subject: subject.to_string(),
            plan,
            results,
            analysis,
        })
    }

    /// Ask the model which tools to call
    pub async fn plan(&self, query: &str, subject: &str, tools: &[ToolSchema]) -> Result<Plan> {
        let system = self
            .config
            .planning_prompt
            .replace("{tools}", &describe_tools(tools))
            .replace("{subject}", subject)
            .replace("{query}", query)
            .replace("{max_calls}", &self.config.max_tool_calls.to_string());

        let messages = [
            Message::system(system),
            Message::user(format!("Question: {query}\nDetected subject: {subject}")),
        ];

        let completion = self
            .provider
            .complete(&messages, &self.options(&self.config.planning))
            .await?;

        match parse_tool_plan(&completion.content, self.config.max_tool_calls) {
            Some(calls) => {
                tracing::debug!(calls = calls.len(), "Model planned tool calls");
                Ok(Plan { calls, fallback: false })
            }
            None => {
                tracing::warn!(
                    output = %truncate(&completion.content, 200),
                    "Unusable plan from model, substituting fallback call"
                );
                Ok(Plan {
                    calls: vec![self.fallback_call(subject)],
                    fallback: true,
                })
            }
        }
    }

    /// Execute calls one at a time; failures are recorded, never fatal
    pub async fn execute(&self, calls: &[ToolCall], tools: &[ToolSchema]) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            tracing::debug!(tool = %call.tool, reason = %call.reason, "Executing tool");

            let outcome = if !tools.is_empty() && !tools.iter().any(|t| t.name == call.tool) {
                Err(AgentError::ToolNotFound(call.tool.clone()))
            } else {
                self.call_with_timeout(call).await
            };

            let result = match outcome {
                Ok(value) => ToolResult::success(call, value),
                Err(e) => {
                    tracing::warn!(tool = %call.tool, error = %e, "Tool call failed");
                    ToolResult::failure(call, e.to_string())
                }
            };
            results.push(result);
        }

        results
    }

    /// Ask the model for the final analysis
    pub async fn synthesize(
        &self,
        query: &str,
        subject: &str,
        results: &[ToolResult],
    ) -> Result<String> {
        let rendered = if results.is_empty() {
            "No tool results were collected.".to_string()
        } else {
            results
                .iter()
                .map(ToolResult::render_for_prompt)
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let system = self
            .config
            .synthesis_prompt
            .replace("{subject}", subject)
            .replace("{query}", query)
            .replace("{results}", &rendered);

        let messages = [Message::system(system), Message::user(query)];

        let completion = self
            .provider
            .complete(&messages, &self.options(&self.config.synthesis))
            .await?;

        let content = completion.content.trim();
        if content.is_empty() {
            return Err(AgentError::Parse("Model returned an empty analysis".into()));
        }
        Ok(content.to_string())
    }

    async fn call_with_timeout(&self, call: &ToolCall) -> Result<serde_json::Value> {
        tokio::time::timeout(self.config.tool_timeout, self.tools.call_tool(&call.tool, &call.args))
            .await
            .map_err(|_| AgentError::ToolTimeout {
                tool: call.tool.clone(),
                secs: self.config.tool_timeout.as_secs(),
            })?
    }

    fn fallback_call(&self, subject: &str) -> ToolCall {
        ToolCall::new(&self.config.fallback_tool)
            .arg(&self.config.fallback_argument, subject)
            .reason("Fallback: model did not return a usable plan")
    }

    /// Fill in the provider's model when the options leave it blank
    fn options(&self, base: &GenerationOptions) -> GenerationOptions {
        let mut options = base.clone();
        if options.model.is_empty() {
            options.model = self.provider.default_model().to_string();
        }
        options
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn tool_service(&self) -> &Arc<dyn ToolService> {
        &self.tools
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Completion, ModelInfo};
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned completions and records the prompts it saw
    struct ScriptedProvider {
        replies: Mutex<VecDeque<String>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|s| (*s).to_string()).collect()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted-model"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            messages: &[Message],
            options: &GenerationOptions,
        ) -> Result<Completion> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AgentError::Provider("script exhausted".into()))?;
            Ok(Completion::text(reply, &options.model))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }
    }

    struct FakeTools {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ToolService for FakeTools {
        fn name(&self) -> &str {
            "fake"
        }

        async fn list_tools(&self) -> Result<Vec<ToolSchema>> {
            Ok(["Topic", "Broken", "Slow"]
                .iter()
                .map(|n| ToolSchema {
                    name: (*n).into(),
                    description: String::new(),
                    input_schema: Value::Null,
                })
                .collect())
        }

        async fn call_tool(&self, name: &str, args: &Map<String, Value>) -> Result<Value> {
            self.calls.lock().unwrap().push(name.to_string());
            match name {
                "Broken" => Err(AgentError::ToolService("HTTP 500".into())),
                "Slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Value::Null)
                }
                _ => Ok(json!({"topic": args.get("topic"), "galaxy_score": 70})),
            }
        }
    }

    fn orchestrator(replies: &[&str]) -> (Orchestrator, Arc<ScriptedProvider>, Arc<FakeTools>) {
        let provider = Arc::new(ScriptedProvider::new(replies));
        let tools = Arc::new(FakeTools { calls: Mutex::new(Vec::new()) });
        let config = OrchestratorConfig {
            fallback_tool: "Topic".into(),
            fallback_argument: "topic".into(),
            tool_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let orch = Orchestrator::new(provider.clone(), tools.clone(), config);
        (orch, provider, tools)
    }

    #[tokio::test]
    async fn test_run_collects_partial_failures() {
        let plan = r#"[
            {"tool": "Topic", "args": {"topic": "bitcoin"}, "reason": "metrics"},
            {"tool": "Broken", "args": {}, "reason": "will fail"},
            {"tool": "Missing", "args": {}, "reason": "not offered"},
            {"tool": "Topic", "args": {"topic": "ethereum"}, "reason": "compare"}
        ]"#;
        let (orch, provider, tools) = orchestrator(&[plan, "Bitcoin looks steady."]);

        let outcome = orch.run("how is bitcoin?", "btc").await.unwrap();

        assert!(!outcome.plan.fallback);
        assert_eq!(outcome.results.len(), 4);
        assert_eq!(outcome.failures().count(), 2);
        assert!(outcome.results[3].success);
        assert_eq!(outcome.analysis, "Bitcoin looks steady.");
        // The unknown tool never reaches the service, and order is preserved
        assert_eq!(*tools.calls.lock().unwrap(), ["Topic", "Broken", "Topic"]);

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0][0].content.contains("### Topic"));
        assert!(seen[1][0].content.contains("[Tool 'Broken' {} failed]"));
    }

    #[tokio::test]
    async fn test_unparseable_plan_uses_fallback_call() {
        let (orch, _, tools) = orchestrator(&["I'd rather chat.", "Here is my take."]);

        let outcome = orch.run("tell me about solana", "sol").await.unwrap();

        assert!(outcome.plan.fallback);
        assert_eq!(outcome.plan.calls.len(), 1);
        assert_eq!(outcome.plan.calls[0].tool, "Topic");
        assert_eq!(outcome.plan.calls[0].args["topic"], "sol");
        assert_eq!(*tools.calls.lock().unwrap(), ["Topic"]);
    }

    #[tokio::test]
    async fn test_timeout_becomes_error_entry() {
        let (orch, _, _) = orchestrator(&[]);
        let schemas = orch.tool_service().list_tools().await.unwrap();

        let results = orch
            .execute(&[ToolCall::new("Slow"), ToolCall::new("Topic")], &schemas)
            .await;

        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("timed out"));
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn test_provider_failure_is_fatal() {
        let (orch, _, _) = orchestrator(&[]);
        let err = orch.run("btc?", "btc").await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[tokio::test]
    async fn test_empty_synthesis_is_an_error() {
        let (orch, _, _) = orchestrator(&["[]", "   "]);
        let err = orch.run("btc?", "btc").await.unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
    }

    #[tokio::test]
    async fn test_blank_model_uses_provider_default() {
        let (orch, _, _) = orchestrator(&[]);
        let opts = orch.options(&GenerationOptions::with_model(""));
        assert_eq!(opts.model, "scripted-model");
    }
}
