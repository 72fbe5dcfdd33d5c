//! # agent-speech
//!
//! Turns an analysis into audio. With vendor credentials the text goes to a
//! cloud text-to-speech API and comes back base64-encoded; without them, or
//! when the caller asks for the browser engine, the response only carries
//! `use_local_fallback` so the client speaks the text itself.

pub mod error;
pub mod text;
pub mod vendor;

use std::sync::Arc;

use agent_runtime::ProbeTarget;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

pub use error::{Result, SpeechError};
pub use text::prepare_text;
pub use vendor::{Audio, ElevenLabsVendor, SpeechVendor};

/// Named voices accepted in place of raw vendor ids
const VOICE_ALIASES: &[(&str, &str)] = &[
    ("rachel", "21m00Tcm4TlvDq8ikWAM"),
    ("adam", "pNInz6obpgDQGcFmaJgB"),
    ("bella", "EXAVITQu4vr4xnSDxMaL"),
    ("antoni", "ErXwobaYiN019PkySvjV"),
    ("josh", "TxGEqnHWrfWFTfGW9XjX"),
];

/// Speech configuration
#[derive(Clone, Debug)]
pub struct SpeechConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub voice_id: String,
    pub model_id: String,
    pub max_chars: usize,
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.elevenlabs.io".into(),
            voice_id: "21m00Tcm4TlvDq8ikWAM".into(),
            model_id: "eleven_multilingual_v2".into(),
            max_chars: 2500,
            timeout_secs: 30,
        }
    }
}

impl SpeechConfig {
    /// Read `TTS_API_KEY`, `TTS_API_BASE`, `TTS_VOICE_ID` and `TTS_MODEL_ID`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("TTS_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            api_base: std::env::var("TTS_API_BASE").unwrap_or(defaults.api_base),
            voice_id: std::env::var("TTS_VOICE_ID").unwrap_or(defaults.voice_id),
            model_id: std::env::var("TTS_MODEL_ID").unwrap_or(defaults.model_id),
            ..defaults
        }
    }
}

/// Which engine should speak
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechEngine {
    #[default]
    #[serde(alias = "elevenlabs")]
    Cloud,
    #[serde(alias = "local", alias = "native")]
    Browser,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub engine: Option<SpeechEngine>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SpeechResponse {
    pub use_local_fallback: bool,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SpeechResponse {
    fn local(text: String, reason: &str) -> Self {
        Self {
            use_local_fallback: true,
            text,
            audio_base64: None,
            content_type: None,
            voice_id: None,
            reason: Some(reason.to_string()),
        }
    }
}

/// Resolve a voice alias or pass a raw vendor id through
pub fn resolve_voice(voice: &str) -> &str {
    let wanted = voice.trim();
    VOICE_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(wanted))
        .map_or(wanted, |(_, id)| id)
}

/// Speech front door used by the HTTP layer
pub struct SpeechSynthesizer {
    vendor: Option<Arc<dyn SpeechVendor>>,
    config: SpeechConfig,
}

impl SpeechSynthesizer {
    pub fn new(config: SpeechConfig) -> Result<Self> {
        let vendor: Option<Arc<dyn SpeechVendor>> = match &config.api_key {
            Some(key) => Some(Arc::new(ElevenLabsVendor::new(&config, key.clone())?)),
            None => None,
        };
        Ok(Self { vendor, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(SpeechConfig::from_env())
    }

    /// Use a specific vendor (tests, alternative APIs)
    pub fn with_vendor(config: SpeechConfig, vendor: Arc<dyn SpeechVendor>) -> Self {
        Self {
            vendor: Some(vendor),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.vendor.is_some()
    }

    pub fn vendor_name(&self) -> Option<&str> {
        self.vendor.as_deref().map(SpeechVendor::name)
    }

    pub fn probe_target(&self) -> Option<ProbeTarget> {
        self.vendor.as_ref().map(|v| v.probe_target())
    }

    /// Speak `request.text`.
    ///
    /// Missing credentials and the browser engine are not errors: the
    /// response asks the client to speak locally. Vendor failures are
    /// errors, and [`SpeechError::allows_local_fallback`] tells the caller
    /// the client can still take over.
    pub async fn synthesize(&self, request: SpeechRequest) -> Result<SpeechResponse> {
        let text = prepare_text(&request.text, self.config.max_chars)?;

        if request.engine == Some(SpeechEngine::Browser) {
            return Ok(SpeechResponse::local(text, "browser engine requested"));
        }

        let Some(vendor) = &self.vendor else {
            tracing::debug!("No speech vendor configured, signalling local fallback");
            return Ok(SpeechResponse::local(text, "speech vendor not configured"));
        };

        let voice_id = request
            .voice
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| self.config.voice_id.clone(), |v| resolve_voice(v).to_string());

        let audio = vendor.synthesize(&text, &voice_id).await.inspect_err(|e| {
            tracing::warn!(vendor = vendor.name(), error = %e, "Speech synthesis failed");
        })?;

        tracing::info!(
            vendor = vendor.name(),
            voice = %voice_id,
            bytes = audio.bytes.len(),
            "Speech synthesized"
        );

        Ok(SpeechResponse {
            use_local_fallback: false,
            text,
            audio_base64: Some(STANDARD.encode(&audio.bytes)),
            content_type: Some(audio.content_type),
            voice_id: Some(voice_id),
            reason: None,
        })
    }
}
