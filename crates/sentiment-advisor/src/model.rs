//! Domain Models
//!
//! Shapes returned to the UI. Everything here is request-scoped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::format::NOT_AVAILABLE;

/// Trading recommendation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

impl Recommendation {
    /// Case-insensitive parse; accepts common synonyms
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buy" | "strong buy" | "accumulate" => Some(Self::Buy),
            "sell" | "strong sell" | "reduce" => Some(Self::Sell),
            "hold" | "neutral" | "wait" => Some(Self::Hold),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

/// Overall social sentiment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bullish" | "positive" | "very bullish" => Some(Self::Bullish),
            "bearish" | "negative" | "very bearish" => Some(Self::Bearish),
            "neutral" | "mixed" => Some(Self::Neutral),
            _ => None,
        }
    }
}

/// Market and social metrics, pre-formatted; absent values are `"N/A"`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketMetrics {
    pub price: String,
    pub change_24h: String,
    pub market_cap: String,
    pub volume_24h: String,
    pub galaxy_score: String,
    pub alt_rank: String,
    pub social_dominance: String,
    pub sentiment_score: String,
}

impl Default for MarketMetrics {
    fn default() -> Self {
        Self {
            price: NOT_AVAILABLE.into(),
            change_24h: NOT_AVAILABLE.into(),
            market_cap: NOT_AVAILABLE.into(),
            volume_24h: NOT_AVAILABLE.into(),
            galaxy_score: NOT_AVAILABLE.into(),
            alt_rank: NOT_AVAILABLE.into(),
            social_dominance: NOT_AVAILABLE.into(),
            sentiment_score: NOT_AVAILABLE.into(),
        }
    }
}

impl MarketMetrics {
    /// Number of metrics that carry a value
    pub fn available(&self) -> usize {
        [
            &self.price,
            &self.change_24h,
            &self.market_cap,
            &self.volume_24h,
            &self.galaxy_score,
            &self.alt_rank,
            &self.social_dominance,
            &self.sentiment_score,
        ]
        .iter()
        .filter(|v| v.as_str() != NOT_AVAILABLE)
        .count()
    }
}

/// One executed tool call, as reported to the UI
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSummary {
    pub tool: String,
    pub reason: String,
    pub success: bool,
}

/// A tool call that failed; the request still succeeded
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FailedTool {
    pub tool: String,
    pub error: String,
}

/// Final analysis returned to the UI
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub request_id: String,
    pub query: String,
    pub symbol: String,
    pub coin_name: String,
    pub recommendation: Recommendation,

    /// 0..=100
    pub confidence: u8,
    pub sentiment: Sentiment,
    pub reasoning: String,
    pub metrics: MarketMetrics,
    pub spoken_text: String,
    pub tool_results: Vec<ToolSummary>,
    pub failed_tools: Vec<FailedTool>,

    /// True when the model's plan was unusable and the fallback call ran
    pub fallback_plan: bool,
    pub generated_at: DateTime<Utc>,
}

/// Error body with the message the UI should speak
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub spoken_text: String,
}
