//! Metric Extraction
//!
//! Pulls market/social numbers out of whatever the tool service returned:
//! structured JSON (searched breadth-first), JSON embedded in text blocks,
//! or `Label: value` lines in prose. Values the synthesis model reported are
//! the last resort.

use std::collections::VecDeque;
use std::sync::LazyLock;

use agent_core::{extract::extract_json, ToolResult};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::format::{
    format_currency, format_percentage, format_plain, parse_decimal, to_decimal, NOT_AVAILABLE,
};
use crate::model::MarketMetrics;

#[derive(Clone, Copy)]
enum Render {
    Currency,
    SignedPercent,
    Share,
    Plain(u32),
}

struct MetricField {
    keys: &'static [&'static str],
    label: &'static str,
    render: Render,
}

/// Order matches the fields of [`MarketMetrics`]
const FIELDS: [MetricField; 8] = [
    MetricField {
        keys: &["price", "price_usd", "current_price", "close"],
        label: r"price(?:\s*\(usd\))?|current\s+price",
        render: Render::Currency,
    },
    MetricField {
        keys: &["percent_change_24h", "price_change_24h", "change_24h", "percent_change"],
        label: r"(?:24h|24-hour)\s*(?:price\s*)?change|(?:price\s*|percent\s*)?change\s*(?:\(24h\)|24h)",
        render: Render::SignedPercent,
    },
    MetricField {
        keys: &["market_cap", "marketcap", "market_capitalization"],
        label: r"market\s*cap(?:italization)?",
        render: Render::Currency,
    },
    MetricField {
        keys: &["volume_24h", "total_volume", "volume"],
        label: r"(?:24h\s*)?(?:trading\s*)?volume(?:\s*\(24h\)|\s*24h)?",
        render: Render::Currency,
    },
    MetricField {
        keys: &["galaxy_score"],
        label: r"galaxy\s*score",
        render: Render::Plain(1),
    },
    MetricField {
        keys: &["alt_rank", "altrank"],
        label: r"alt\s*rank",
        render: Render::Plain(0),
    },
    MetricField {
        keys: &["social_dominance"],
        label: r"social\s*dominance",
        render: Render::Share,
    },
    MetricField {
        keys: &["sentiment", "sentiment_score"],
        label: r"sentiment(?:\s*score)?",
        render: Render::Share,
    },
];

static LABEL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    FIELDS
        .iter()
        .map(|field| {
            Regex::new(&format!(
                r"(?i)\b(?:{})\b[*_\s]*[:=][*_\s]*([-+]?)\s*\$?\s*([\d,]*\.?\d+)(?-i:([KMBT]))?\b",
                field.label
            ))
            .expect("metric label regex is valid")
        })
        .collect()
});

/// Build the metrics block from tool results, falling back to `hints`
pub fn collect_metrics(results: &[ToolResult], hints: &Map<String, Value>) -> MarketMetrics {
    let mut docs = Vec::new();
    let mut texts = Vec::new();

    for value in results.iter().filter(|r| r.success).filter_map(|r| r.result.as_ref()) {
        gather(value, &mut docs, &mut texts);
    }

    let hints = Value::Object(hints.clone());
    let rendered: Vec<String> = FIELDS
        .iter()
        .zip(LABEL_PATTERNS.iter())
        .map(|(field, pattern)| {
            docs.iter()
                .find_map(|d| find_key(d, field.keys))
                .or_else(|| texts.iter().find_map(|t| scan_text(t, pattern)))
                .or_else(|| find_key(&hints, field.keys))
                .map_or_else(|| NOT_AVAILABLE.to_string(), |v| render(&v, field.render))
        })
        .collect();

    let mut fields = rendered.into_iter();
    let mut next = || fields.next().unwrap_or_else(|| NOT_AVAILABLE.into());
    MarketMetrics {
        price: next(),
        change_24h: next(),
        market_cap: next(),
        volume_24h: next(),
        galaxy_score: next(),
        alt_rank: next(),
        social_dominance: next(),
        sentiment_score: next(),
    }
}

fn gather(value: &Value, docs: &mut Vec<Value>, texts: &mut Vec<String>) {
    match value {
        Value::String(text) => {
            if let Some(json) = extract_json(text) {
                docs.push(json);
            }
            texts.push(text.clone());
        }
        other => {
            if let Some(blocks) = other.get("content").and_then(Value::as_array) {
                for text in blocks.iter().filter_map(|b| b.get("text").and_then(Value::as_str)) {
                    if let Some(json) = extract_json(text) {
                        docs.push(json);
                    }
                    texts.push(text.to_string());
                }
            }
            if let Some(structured) = other.get("structuredContent") {
                docs.push(structured.clone());
            }
            docs.push(other.clone());
        }
    }
}

/// Breadth-first search for the first numeric value under any of `keys`
fn find_key(root: &Value, keys: &[&str]) -> Option<Value> {
    let mut queue = VecDeque::from([root]);

    while let Some(node) = queue.pop_front() {
        match node {
            Value::Object(map) => {
                if let Some(found) = keys
                    .iter()
                    .filter_map(|k| map.get(*k))
                    .find(|v| to_decimal(v).is_some())
                {
                    return Some(found.clone());
                }
                queue.extend(map.values());
            }
            Value::Array(items) => queue.extend(items.iter()),
            _ => {}
        }
    }
    None
}

fn scan_text(text: &str, pattern: &Regex) -> Option<Value> {
    let caps = pattern.captures(text)?;
    let mut number = parse_decimal(caps.get(2)?.as_str())?;

    if let Some(suffix) = caps.get(3) {
        let scale = match suffix.as_str() {
            "K" => Decimal::from(1_000),
            "M" => Decimal::from(1_000_000),
            "B" => Decimal::from(1_000_000_000_i64),
            _ => Decimal::from(1_000_000_000_000_i64),
        };
        // Out-of-range figures count as missing
        number = number.checked_mul(scale)?;
    }
    if caps.get(1).is_some_and(|s| s.as_str() == "-") {
        number = -number;
    }
    Some(Value::String(number.to_string()))
}

fn render(value: &Value, how: Render) -> String {
    match how {
        Render::Currency => format_currency(value),
        Render::SignedPercent => format_percentage(value),
        Render::Plain(dp) => format_plain(value, dp),
        Render::Share => {
            let plain = format_plain(value, 2);
            if plain == NOT_AVAILABLE { plain } else { format!("{plain}%") }
        }
    }
}
