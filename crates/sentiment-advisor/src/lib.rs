//! # sentiment-advisor
//!
//! Answers "what is the crowd saying about this coin?" by asking an LLM to
//! plan calls against a social-data tool service, then to synthesize a
//! verdict from the results.
//!
//! ## Flow
//!
//! ```text
//! query ──▶ symbol ──▶ tools/list ──▶ plan (LLM) ──▶ tools/call × N ──▶ synthesis (LLM)
//!                                                                        │
//!                        AnalysisResponse ◀── metrics + verdict ◀────────┘
//! ```

pub mod advisor;
pub mod analysis;
pub mod error;
pub mod format;
pub mod metrics;
pub mod model;
pub mod symbol;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use advisor::{AdvisorSettings, SentimentAdvisor};
pub use error::{AdvisorError, Result, FALLBACK_SPOKEN_MESSAGE};
pub use model::{AnalysisResponse, ErrorResponse, MarketMetrics, Recommendation, Sentiment};
pub use symbol::{extract_symbol, Coin};

/// System prompt for the planning pass
pub const PLANNING_PROMPT: &str = r#"You plan data lookups for a cryptocurrency social-sentiment assistant.

The user is asking about: {subject}

{tools}
Choose at most {max_calls} tool calls that best answer the question. Prefer
tools that return social sentiment, engagement and price metrics for {subject}.
Use the tool names and argument names exactly as listed.

Respond ONLY with JSON in this exact shape, no prose:
{"tool_calls": [{"tool": "tool_name", "args": {"arg": "value"}, "reason": "why this call helps"}]}"#;

/// System prompt for the synthesis pass
pub const SYNTHESIS_PROMPT: &str = r#"You are a concise crypto market analyst. Using ONLY the data below, answer
the user's question about {subject}. Some tool calls may have failed; say so
if it limits the analysis.

## Tool Results

{results}

Respond with JSON only:
{"recommendation": "BUY" | "SELL" | "HOLD",
 "confidence": 0-100,
 "sentiment": "BULLISH" | "BEARISH" | "NEUTRAL",
 "reasoning": "two to four sentences citing the numbers",
 "spoken_text": "one or two friendly sentences suitable for text-to-speech, no markdown or symbols",
 "metrics": {"price": number, "percent_change_24h": number, "market_cap": number,
             "volume_24h": number, "galaxy_score": number, "alt_rank": number,
             "social_dominance": number, "sentiment": number}}

This is not financial advice; keep the tone informative."#;
