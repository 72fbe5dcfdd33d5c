//! Sentiment Advisor
//!
//! Query in, [`AnalysisResponse`] out: detect the coin, run the two-pass
//! orchestration, then shape the verdict and metrics.

use std::sync::Arc;
use std::time::Duration;

use agent_core::{LlmProvider, Orchestrator, OrchestratorConfig, ToolService};
use chrono::Utc;
use uuid::Uuid;

use crate::analysis::interpret;
use crate::error::{AdvisorError, Result};
use crate::metrics::collect_metrics;
use crate::model::{AnalysisResponse, FailedTool, ToolSummary};
use crate::symbol::extract_symbol;
use crate::{PLANNING_PROMPT, SYNTHESIS_PROMPT};

/// Tunables read from the environment
#[derive(Clone, Debug)]
pub struct AdvisorSettings {
    /// Upper bound on tool calls per query (`MAX_TOOL_CALLS`)
    pub max_tool_calls: usize,

    /// Per-call time budget (`TOOL_TIMEOUT_SECS`)
    pub tool_timeout: Duration,

    /// Longest accepted query
    pub max_query_chars: usize,

    /// Tool called when the model's plan is unusable
    pub fallback_tool: String,
    pub fallback_argument: String,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            max_tool_calls: 4,
            tool_timeout: Duration::from_secs(20),
            max_query_chars: 500,
            fallback_tool: "Topic".into(),
            fallback_argument: "topic".into(),
        }
    }
}

impl AdvisorSettings {
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Ok(raw) = std::env::var("MAX_TOOL_CALLS") {
            settings.max_tool_calls = raw
                .parse()
                .ok()
                .filter(|n| (1..=10).contains(n))
                .ok_or_else(|| AdvisorError::Config(format!("MAX_TOOL_CALLS must be 1-10, got '{raw}'")))?;
        }
        if let Ok(raw) = std::env::var("TOOL_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| AdvisorError::Config(format!("TOOL_TIMEOUT_SECS is not a number: '{raw}'")))?;
            settings.tool_timeout = Duration::from_secs(secs.max(1));
        }
        if let Ok(tool) = std::env::var("FALLBACK_TOOL") {
            settings.fallback_tool = tool;
        }

        Ok(settings)
    }

    fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            planning_prompt: PLANNING_PROMPT.into(),
            synthesis_prompt: SYNTHESIS_PROMPT.into(),
            max_tool_calls: self.max_tool_calls,
            tool_timeout: self.tool_timeout,
            fallback_tool: self.fallback_tool.clone(),
            fallback_argument: self.fallback_argument.clone(),
            ..Default::default()
        }
    }
}

/// Answers questions about a coin from social and market data
pub struct SentimentAdvisor {
    orchestrator: Orchestrator,
    max_query_chars: usize,
}

impl SentimentAdvisor {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<dyn ToolService>,
        settings: &AdvisorSettings,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(provider, tools, settings.orchestrator_config()),
            max_query_chars: settings.max_query_chars,
        }
    }

    /// Analyze a typed or transcribed query
    pub async fn analyze(&self, query: &str) -> Result<AnalysisResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AdvisorError::EmptyQuery);
        }
        if query.chars().count() > self.max_query_chars {
            return Err(AdvisorError::QueryTooLong { max: self.max_query_chars });
        }

        let request_id = Uuid::new_v4().to_string();
        let coin = extract_symbol(query);
        let subject = coin.name.to_lowercase();
        tracing::info!(%request_id, symbol = coin.symbol, "Analyzing query");

        let outcome = self.orchestrator.run(query, &subject).await?;
        let verdict = interpret(&outcome.analysis);
        let metrics = collect_metrics(&outcome.results, &verdict.metrics);

        let failed_tools: Vec<FailedTool> = outcome
            .failures()
            .map(|r| FailedTool {
                tool: r.tool.clone(),
                error: r.error.clone().unwrap_or_default(),
            })
            .collect();
        if !failed_tools.is_empty() {
            tracing::warn!(%request_id, failed = failed_tools.len(), "Analysis completed with tool failures");
        }

        Ok(AnalysisResponse {
            request_id,
            query: query.to_string(),
            symbol: coin.symbol.to_string(),
            coin_name: coin.name.to_string(),
            recommendation: verdict.recommendation,
            confidence: verdict.confidence,
            sentiment: verdict.sentiment,
            reasoning: verdict.reasoning,
            metrics,
            spoken_text: verdict.spoken_text,
            tool_results: outcome
                .results
                .iter()
                .map(|r| ToolSummary {
                    tool: r.tool.clone(),
                    reason: r.reason.clone(),
                    success: r.success,
                })
                .collect(),
            failed_tools,
            fallback_plan: outcome.plan.fallback,
            generated_at: Utc::now(),
        })
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        self.orchestrator.provider()
    }

    pub fn tool_service(&self) -> &Arc<dyn ToolService> {
        self.orchestrator.tool_service()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Recommendation, Sentiment};
    use crate::testing::{FakeLlm, FakeSocialTools};
    use agent_core::AgentError;

    fn advisor(replies: &[&str], tools: FakeSocialTools) -> SentimentAdvisor {
        SentimentAdvisor::new(
            Arc::new(FakeLlm::new(replies)),
            Arc::new(tools),
            &AdvisorSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_bitcoin() {
        let plan = r#"{"tool_calls": [
            {"tool": "Topic", "args": {"topic": "bitcoin"}, "reason": "social metrics"},
            {"tool": "Topic_Time_Series", "args": {"topic": "bitcoin"}, "reason": "trend"}
        ]}"#;
        let synthesis = r#"{"recommendation": "HOLD", "confidence": 62, "sentiment": "bullish",
            "reasoning": "Engagement is high but price is flat.",
            "spoken_text": "Bitcoin sentiment is bullish, but I'd hold for now."}"#;

        let advisor = advisor(&[plan, synthesis], FakeSocialTools::with_failing("Topic_Time_Series"));
        let response = advisor.analyze("  What do people think about Bitcoin?  ").await.unwrap();

        assert_eq!(response.symbol, "btc");
        assert_eq!(response.coin_name, "Bitcoin");
        assert_eq!(response.query, "What do people think about Bitcoin?");
        assert_eq!(response.recommendation, Recommendation::Hold);
        assert_eq!(response.sentiment, Sentiment::Bullish);
        assert_eq!(response.confidence, 62);
        assert_eq!(response.metrics.price, "$97.50K");
        assert_eq!(response.metrics.galaxy_score, "71");
        assert_eq!(response.tool_results.len(), 2);
        assert_eq!(response.failed_tools.len(), 1);
        assert_eq!(response.failed_tools[0].tool, "Topic_Time_Series");
        assert!(!response.fallback_plan);
        assert!(Uuid::parse_str(&response.request_id).is_ok());
    }

    #[tokio::test]
    async fn test_garbled_plan_falls_back_to_topic_call() {
        let advisor = advisor(
            &["Sure, let me look that up!", "Dogecoin chatter is negative and weak. Sell."],
            FakeSocialTools::default(),
        );
        let response = advisor.analyze("how's doge?").await.unwrap();

        assert_eq!(response.symbol, "doge");
        assert!(response.fallback_plan);
        assert_eq!(response.tool_results.len(), 1);
        assert_eq!(response.tool_results[0].tool, "Topic");
        assert_eq!(response.recommendation, Recommendation::Sell);
        assert_eq!(response.sentiment, Sentiment::Bearish);
        assert_eq!(response.spoken_text, response.reasoning);
    }

    #[tokio::test]
    async fn test_query_validation() {
        let advisor = advisor(&[], FakeSocialTools::default());
        assert!(matches!(advisor.analyze("   ").await, Err(AdvisorError::EmptyQuery)));

        let long = "a".repeat(501);
        assert!(matches!(
            advisor.analyze(&long).await,
            Err(AdvisorError::QueryTooLong { max: 500 })
        ));
    }

    #[tokio::test]
    async fn test_discovery_failure_propagates() {
        let advisor = advisor(&["[]", "ok"], FakeSocialTools::unreachable());
        let err = advisor.analyze("eth?").await.unwrap_err();
        assert!(matches!(err, AdvisorError::Agent(AgentError::ToolService(_))));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = AdvisorSettings::default();
        let config = settings.orchestrator_config();
        assert_eq!(config.max_tool_calls, 4);
        assert_eq!(config.fallback_tool, "Topic");
        assert!(config.planning_prompt.contains("{tools}"));
    }
}
