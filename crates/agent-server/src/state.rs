//! Application State

use std::sync::Arc;
use std::time::Duration;

use agent_runtime::{probe, ProbeReport, ProbeTarget};
use agent_speech::SpeechSynthesizer;
use sentiment_advisor::SentimentAdvisor;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Query analysis pipeline (LLM + social-data tools)
    pub advisor: Arc<SentimentAdvisor>,

    /// Cloud speech, or a local fallback signal when unconfigured
    pub speech: Arc<SpeechSynthesizer>,

    /// Raw connectivity checks for the diagnostics endpoints
    pub probes: Arc<Probes>,
}

impl AppState {
    pub fn new(advisor: SentimentAdvisor, speech: SpeechSynthesizer, probes: Probes) -> Self {
        Self {
            advisor: Arc::new(advisor),
            speech: Arc::new(speech),
            probes: Arc::new(probes),
        }
    }
}

/// Vendor endpoints to probe
pub struct Probes {
    client: reqwest::Client,
    pub llm: ProbeTarget,
    pub tools: ProbeTarget,
    timeout: Duration,
}

impl Probes {
    pub fn new(llm: ProbeTarget, tools: ProbeTarget, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            llm,
            tools,
            timeout,
        }
    }

    pub async fn run(&self, target: &ProbeTarget) -> ProbeReport {
        probe(&self.client, target, self.timeout).await
    }
}
