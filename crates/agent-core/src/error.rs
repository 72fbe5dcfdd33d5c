//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Remote tool service failed (discovery or call)
    #[error("Tool service error: {0}")]
    ToolService(String),

    /// Tool not offered by the tool service
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool call exceeded its time budget
    #[error("Tool '{tool}' timed out after {secs}s")]
    ToolTimeout { tool: String, secs: u64 },

    /// Parse error (e.g., model output)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(_) | Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::ToolService(_) | Self::ToolTimeout { .. } => {
                "The market data service is not responding right now.".into()
            }
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication with an upstream service failed.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_details() {
        let err = AgentError::Provider("500 from upstream: secret body".into());
        assert!(!err.user_message().contains("secret"));

        let err = AgentError::ToolTimeout { tool: "Topic".into(), secs: 20 };
        assert_eq!(err.to_string(), "Tool 'Topic' timed out after 20s");
    }
}
