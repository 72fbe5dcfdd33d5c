//! # agent-runtime
//!
//! Vendor adapters for the orchestrator.
//!
//! ## Providers
//!
//! - **OpenAI-compatible**: any `/chat/completions` endpoint (`LLM_API_KEY`)
//! - **Ollama** (default feature): local inference via Ollama
//!
//! ## Tool services
//!
//! - **HTTP MCP**: JSON-RPC tool server (`SOCIAL_MCP_URL`, `SOCIAL_API_KEY`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{llm_from_env, HttpToolService};
//!
//! let llm = llm_from_env()?;
//! let tools = Arc::new(HttpToolService::from_env()?);
//! let orchestrator = Orchestrator::new(llm.provider, tools, config);
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;
pub mod mcp;
pub mod openai;
pub mod probe;

use std::sync::Arc;

#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;
pub use mcp::HttpToolService;
pub use openai::OpenAiProvider;
pub use probe::{probe, ProbeReport, ProbeTarget};

pub use agent_core::{AgentError, LlmProvider, Result, ToolService};

/// A configured provider and the endpoint used to diagnose it
pub struct LlmBackend {
    pub provider: Arc<dyn LlmProvider>,
    pub probe: ProbeTarget,
}

/// Select the LLM provider from `LLM_PROVIDER` (`openai` | `ollama`).
///
/// Without `LLM_PROVIDER`, an `LLM_API_KEY` selects the OpenAI-compatible
/// provider and its absence selects Ollama.
pub fn llm_from_env() -> Result<LlmBackend> {
    let choice = std::env::var("LLM_PROVIDER").ok().map(|s| s.to_ascii_lowercase());
    let has_key = std::env::var("LLM_API_KEY").is_ok();

    match choice.as_deref() {
        Some("openai") => openai_backend(),
        Some("ollama") => ollama_backend(),
        Some(other) => Err(AgentError::Config(format!("Unknown LLM_PROVIDER '{other}'"))),
        None if has_key => openai_backend(),
        None => ollama_backend(),
    }
}

fn openai_backend() -> Result<LlmBackend> {
    let provider = OpenAiProvider::from_env()?;
    Ok(LlmBackend {
        probe: provider.probe_target(),
        provider: Arc::new(provider),
    })
}

#[cfg(feature = "ollama")]
fn ollama_backend() -> Result<LlmBackend> {
    let provider = OllamaProvider::from_env();
    Ok(LlmBackend {
        probe: provider.probe_target(),
        provider: Arc::new(provider),
    })
}

#[cfg(not(feature = "ollama"))]
fn ollama_backend() -> Result<LlmBackend> {
    Err(AgentError::Config(
        "Ollama support not compiled in; set LLM_PROVIDER=openai and LLM_API_KEY".into(),
    ))
}
