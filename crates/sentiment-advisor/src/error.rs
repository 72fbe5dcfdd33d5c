//! Error Types for the Sentiment Advisor

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

/// Spoken whenever the analysis pipeline fails, whatever the cause
pub const FALLBACK_SPOKEN_MESSAGE: &str =
    "Sorry, I couldn't complete that analysis right now. Please try again in a moment.";

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("Query exceeds {max} characters")]
    QueryTooLong { max: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl AdvisorError {
    /// Stable code for API clients
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "EMPTY_QUERY",
            Self::QueryTooLong { .. } => "QUERY_TOO_LONG",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Agent(_) => "ANALYSIS_FAILED",
        }
    }

    /// Whether the caller, not an upstream service, is at fault
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyQuery | Self::QueryTooLong { .. })
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyQuery => "Please ask about a cryptocurrency.".into(),
            Self::QueryTooLong { max } => format!("Please keep questions under {max} characters."),
            Self::Config(_) => "The service is not configured correctly.".into(),
            Self::Agent(e) => e.user_message(),
        }
    }
}
