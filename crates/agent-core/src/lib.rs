//! # agent-core
//!
//! Provider-agnostic LLM orchestration over an external tool service.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Orchestrator                          │
//! │  ┌──────────┐    ┌──────────────┐    ┌────────────────────┐  │
//! │  │   Plan   │───▶│   Execute    │───▶│     Synthesize     │  │
//! │  │ (LLM #1) │    │ (ToolService)│    │      (LLM #2)      │  │
//! │  └──────────┘    └──────────────┘    └────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between Ollama, OpenAI-compatible
//! endpoints, or any other backend without changing orchestration logic. The
//! `ToolService` trait does the same for the remote tool server.

pub mod error;
pub mod extract;
pub mod message;
pub mod orchestrator;
pub mod provider;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Message, Role};
pub use orchestrator::{Orchestration, Orchestrator, OrchestratorConfig};
pub use provider::LlmProvider;
pub use tool::{ToolCall, ToolResult, ToolSchema, ToolService};
