//! Speech Error Types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpeechError>;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Nothing to speak")]
    EmptyText,

    #[error("Speech vendor error: {0}")]
    Vendor(String),

    #[error("Speech vendor rejected credentials")]
    Auth,

    #[error("Speech vendor rate limit: {0}")]
    RateLimited(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SpeechError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyText => "EMPTY_TEXT",
            Self::Vendor(_) => "TTS_VENDOR_ERROR",
            Self::Auth => "TTS_AUTH_FAILED",
            Self::RateLimited(_) => "TTS_RATE_LIMITED",
            Self::Config(_) => "TTS_CONFIG_ERROR",
        }
    }

    /// Whether the browser can still speak the text itself
    pub const fn allows_local_fallback(&self) -> bool {
        !matches!(self, Self::EmptyText)
    }
}
