//! Cloud Speech Vendors

use std::time::Duration;

use agent_runtime::ProbeTarget;
use async_trait::async_trait;
use serde_json::json;

use crate::error::{Result, SpeechError};
use crate::SpeechConfig;

/// Rendered audio
#[derive(Clone, Debug)]
pub struct Audio {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// A cloud text-to-speech vendor
#[async_trait]
pub trait SpeechVendor: Send + Sync {
    fn name(&self) -> &str;

    /// Render `text` with the given vendor voice id
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Audio>;

    /// Request used by the diagnostics endpoint
    fn probe_target(&self) -> ProbeTarget;
}

/// ElevenLabs REST API
pub struct ElevenLabsVendor {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model_id: String,
}

impl ElevenLabsVendor {
    pub fn new(config: &SpeechConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SpeechError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model_id: config.model_id.clone(),
        })
    }
}

#[async_trait]
impl SpeechVendor for ElevenLabsVendor {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Audio> {
        let url = format!("{}/v1/text-to-speech/{voice_id}", self.api_base);
        tracing::debug!(%url, chars = text.chars().count(), "Requesting speech synthesis");

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&json!({
                "text": text,
                "model_id": self.model_id,
                "voice_settings": {
                    "stability": 0.5,
                    "similarity_boost": 0.75,
                },
            }))
            .send()
            .await
            .map_err(|e| SpeechError::Vendor(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => SpeechError::Auth,
                429 => SpeechError::RateLimited(body),
                _ => SpeechError::Vendor(format!("HTTP {status}: {body}")),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Vendor(format!("Failed to read audio: {e}")))?;

        if bytes.is_empty() {
            return Err(SpeechError::Vendor("Vendor returned no audio".into()));
        }

        Ok(Audio {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    fn probe_target(&self) -> ProbeTarget {
        ProbeTarget::get("speech", format!("{}/v1/voices", self.api_base))
            .header("xi-api-key", &self.api_key)
    }
}
