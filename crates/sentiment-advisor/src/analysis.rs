//! Interpreting the Synthesis
//!
//! The synthesis model is asked for a JSON verdict. When it answers in prose
//! instead, the recommendation and sentiment are inferred from keywords so
//! the UI always gets a complete response.

use std::sync::LazyLock;

use agent_core::extract::extract_matching;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::format::to_decimal;
use crate::model::{Recommendation, Sentiment};

/// Confidence used when the model gives none
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// What the model concluded
#[derive(Clone, Debug)]
pub struct Verdict {
    pub recommendation: Recommendation,
    pub confidence: u8,
    pub sentiment: Sentiment,
    pub reasoning: String,
    pub spoken_text: String,

    /// Metrics the model quoted, used when tool data lacks them
    pub metrics: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct SynthesisPayload {
    #[serde(default)]
    recommendation: Option<String>,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default, alias = "analysis", alias = "summary")]
    reasoning: Option<String>,
    #[serde(default, alias = "speech", alias = "spoken")]
    spoken_text: Option<String>,
    #[serde(default)]
    metrics: Option<Map<String, Value>>,
}

impl SynthesisPayload {
    fn is_meaningful(&self) -> bool {
        self.recommendation.is_some() || self.reasoning.is_some() || self.spoken_text.is_some()
    }
}

static RECOMMEND_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:recommend(?:ation)?|verdict|rating)\b[^a-z]{0,4}(?:is\s+)?(?:to\s+)?(?:a\s+)?\b(buy|sell|hold)\b")
        .expect("recommendation regex is valid")
});

static ACTION_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(buy|sell|hold)\b").expect("action regex is valid"));

static CONFIDENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:confidence[^\d\n]{0,15}(\d{1,3}(?:\.\d+)?)\s*%?|(\d{1,3})\s*%\s*confiden)")
        .expect("confidence regex is valid")
});

const BULLISH_WORDS: &[&str] = &["bullish", "positive", "optimistic", "upward", "rally", "strong", "surge"];
const BEARISH_WORDS: &[&str] = &["bearish", "negative", "pessimistic", "downward", "decline", "weak", "drop"];

/// Turn synthesis output into a verdict
pub fn interpret(text: &str) -> Verdict {
    let text = text.trim();

    match extract_matching(text, SynthesisPayload::is_meaningful) {
        Some(payload) => from_payload(payload, text),
        None => from_prose(text),
    }
}

fn from_payload(payload: SynthesisPayload, raw: &str) -> Verdict {
    let reasoning = payload
        .reasoning
        .filter(|r| !r.trim().is_empty())
        .or_else(|| payload.spoken_text.clone())
        .unwrap_or_else(|| raw.to_string());

    let recommendation = payload
        .recommendation
        .as_deref()
        .and_then(Recommendation::parse)
        .unwrap_or_else(|| infer_recommendation(&reasoning));

    let sentiment = payload
        .sentiment
        .as_deref()
        .and_then(Sentiment::parse)
        .unwrap_or_else(|| infer_sentiment(&reasoning));

    let confidence = payload
        .confidence
        .as_ref()
        .and_then(normalize_confidence)
        .unwrap_or_else(|| infer_confidence(&reasoning));

    let spoken_text = payload
        .spoken_text
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| reasoning.clone());

    Verdict {
        recommendation,
        confidence,
        sentiment,
        reasoning,
        spoken_text,
        metrics: payload.metrics.unwrap_or_default(),
    }
}

fn from_prose(text: &str) -> Verdict {
    Verdict {
        recommendation: infer_recommendation(text),
        confidence: infer_confidence(text),
        sentiment: infer_sentiment(text),
        reasoning: text.to_string(),
        spoken_text: text.to_string(),
        metrics: Map::new(),
    }
}

/// Explicit "recommendation: X" wins, else the most frequent action word,
/// else HOLD. Ties resolve to HOLD.
pub fn infer_recommendation(text: &str) -> Recommendation {
    if let Some(found) = RECOMMEND_PHRASE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| Recommendation::parse(m.as_str()))
    {
        return found;
    }

    let (mut buy, mut sell, mut hold) = (0usize, 0usize, 0usize);
    for m in ACTION_WORD.find_iter(text) {
        match m.as_str().to_ascii_lowercase().as_str() {
            "buy" => buy += 1,
            "sell" => sell += 1,
            _ => hold += 1,
        }
    }

    if buy > sell && buy > hold {
        Recommendation::Buy
    } else if sell > buy && sell > hold {
        Recommendation::Sell
    } else {
        Recommendation::Hold
    }
}

/// Keyword balance; ties are neutral
pub fn infer_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let count = |words: &[&str]| -> usize { words.iter().map(|w| lower.matches(w).count()).sum() };

    let (bull, bear) = (count(BULLISH_WORDS), count(BEARISH_WORDS));
    match bull.cmp(&bear) {
        std::cmp::Ordering::Greater => Sentiment::Bullish,
        std::cmp::Ordering::Less => Sentiment::Bearish,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

fn infer_confidence(text: &str) -> u8 {
    CONFIDENCE
        .captures(text)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .and_then(|m| normalize_confidence(&Value::String(m.as_str().to_string())))
        .unwrap_or(DEFAULT_CONFIDENCE)
}

/// Accepts 0..=100 or a 0..1 fraction; clamps into 0..=100
fn normalize_confidence(value: &Value) -> Option<u8> {
    let mut n = to_decimal(value)?;
    if n > Decimal::ZERO && n < Decimal::ONE {
        n *= Decimal::from(100);
    }
    let clamped = n.round().clamp(Decimal::ZERO, Decimal::from(100));
    clamped.to_u8()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_verdict() {
        let text = r#"```json
        {"recommendation": "buy", "confidence": 78, "sentiment": "bullish",
         "reasoning": "Social volume is climbing.", "spoken_text": "Bitcoin looks good.",
         "metrics": {"galaxy_score": 71}}
        ```"#;
        let verdict = interpret(text);
        assert_eq!(verdict.recommendation, Recommendation::Buy);
        assert_eq!(verdict.confidence, 78);
        assert_eq!(verdict.sentiment, Sentiment::Bullish);
        assert_eq!(verdict.reasoning, "Social volume is climbing.");
        assert_eq!(verdict.spoken_text, "Bitcoin looks good.");
        assert_eq!(verdict.metrics["galaxy_score"], 71);
    }

    #[test]
    fn test_json_with_gaps_is_filled_in() {
        let verdict = interpret(r#"{"analysis": "Momentum is weak and sentiment negative. I would sell.", "confidence": 0.64}"#);
        assert_eq!(verdict.recommendation, Recommendation::Sell);
        assert_eq!(verdict.sentiment, Sentiment::Bearish);
        assert_eq!(verdict.confidence, 64);
        assert_eq!(verdict.spoken_text, verdict.reasoning);
    }

    #[test]
    fn test_verdict_after_inline_array() {
        let text = r#"Galaxy scores over two days were [71, 68]. {"recommendation": "SELL", "confidence": 70, "sentiment": "bearish", "reasoning": "Falling."}"#;
        let verdict = interpret(text);
        assert_eq!(verdict.recommendation, Recommendation::Sell);
        assert_eq!(verdict.sentiment, Sentiment::Bearish);
        assert_eq!(verdict.confidence, 70);
        assert_eq!(verdict.reasoning, "Falling.");
        assert_eq!(verdict.spoken_text, "Falling.");
    }

    #[test]
    fn test_prose_fallback() {
        let text = "Sentiment around Solana is bullish and engagement is strong. My recommendation: BUY, with 70% confidence.";
        let verdict = interpret(text);
        assert_eq!(verdict.recommendation, Recommendation::Buy);
        assert_eq!(verdict.sentiment, Sentiment::Bullish);
        assert_eq!(verdict.confidence, 70);
        assert_eq!(verdict.reasoning, text);
    }

    #[test]
    fn test_unrelated_json_is_treated_as_prose() {
        let verdict = interpret(r#"{"foo": 1}"#);
        assert_eq!(verdict.recommendation, Recommendation::Hold);
        assert_eq!(verdict.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(verdict.reasoning, r#"{"foo": 1}"#);
    }

    #[test]
    fn test_recommendation_inference() {
        assert_eq!(infer_recommendation("Nothing decisive here."), Recommendation::Hold);
        assert_eq!(infer_recommendation("Don't buy, don't sell."), Recommendation::Hold);
        assert_eq!(infer_recommendation("Verdict: sell. Buyers are gone, holders should sell."), Recommendation::Sell);
        assert_eq!(infer_recommendation("The recommendation is to hold even though some buy."), Recommendation::Hold);
    }

    #[test]
    fn test_confidence_normalization() {
        assert_eq!(normalize_confidence(&serde_json::json!(150)), Some(100));
        assert_eq!(normalize_confidence(&serde_json::json!(-5)), Some(0));
        assert_eq!(normalize_confidence(&serde_json::json!(0.5)), Some(50));
        assert_eq!(normalize_confidence(&serde_json::json!("85%")), Some(85));
        assert_eq!(normalize_confidence(&serde_json::json!("high")), None);
    }
}
