//! JSON Extraction From Model Output
//!
//! Models wrap JSON in prose or markdown fences often enough that a single
//! `serde_json::from_str` is not enough. Three strategies are tried in order:
//!
//! 1. direct parse of the trimmed text
//! 2. parse of the first markdown code fence body
//! 3. parse of each balanced `[...]` / `{...}` span, left to right

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::tool::ToolCall;

/// Opening brackets tried by the bracket strategy before giving up
const MAX_BRACKET_STARTS: usize = 64;

/// Extract the first JSON value found by any strategy
pub fn extract_json(text: &str) -> Option<Value> {
    extract_as(text)
}

/// Extract the first JSON value that also deserializes into `T`
pub fn extract_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    extract_matching(text, |_: &T| true)
}

/// Extract the first candidate that deserializes into `T` and passes `accept`.
///
/// Candidates are visited in strategy order, so a bracketed span that parses
/// but has the wrong shape does not hide a later one that fits.
pub fn extract_matching<T, F>(text: &str, accept: F) -> Option<T>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    if text.trim().is_empty() {
        return None;
    }

    candidates(text).find_map(|(strategy, value)| match serde_json::from_value::<T>(value) {
        Ok(parsed) if accept(&parsed) => {
            tracing::trace!(strategy, "Extracted JSON from model output");
            Some(parsed)
        }
        Ok(_) => {
            tracing::trace!(strategy, "JSON rejected by shape check");
            None
        }
        Err(e) => {
            tracing::trace!(strategy, error = %e, "JSON shape mismatch");
            None
        }
    })
}

fn candidates(text: &str) -> impl Iterator<Item = (&'static str, Value)> + '_ {
    let direct = parse_direct(text).map(|v| ("direct", v));
    let fenced = parse_markdown_fence(text).map(|v| ("markdown", v));
    direct
        .into_iter()
        .chain(fenced)
        .chain(bracketed_values(text).map(|v| ("brackets", v)))
}

fn parse_direct(text: &str) -> Option<Value> {
    serde_json::from_str(text.trim()).ok()
}

fn parse_markdown_fence(text: &str) -> Option<Value> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // Skip the info string ("json", "tool", ...) on the opening line
    let body_start = after.find('\n').map_or(0, |i| i + 1);
    let body = &after[body_start..];
    let end = body.find("```").unwrap_or(body.len());
    serde_json::from_str(body[..end].trim()).ok()
}

/// Parsed balanced `[...]` / `{...}` spans, in order of their opening bracket.
///
/// An unbalanced opener does not end the scan: a stray `{` in prose can
/// precede a complete object.
fn bracketed_values(text: &str) -> impl Iterator<Item = Value> + '_ {
    text.char_indices()
        .filter(|(_, c)| matches!(c, '[' | '{'))
        .take(MAX_BRACKET_STARTS)
        .filter_map(move |(start, _)| {
            let end = balanced_end(&text[start..])?;
            serde_json::from_str(&text[start..start + end]).ok()
        })
}

/// Byte length of the balanced span starting at `text[0]`, string-aware
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a tool plan emitted by the model.
///
/// Accepts a bare array, an object holding a `tool_calls` array, or a single
/// call object. `name`/`arguments`/`rationale` are accepted as aliases.
/// Entries without a tool name are dropped; the plan is cut to `max_calls`.
/// Returns `None` when nothing usable is found.
pub fn parse_tool_plan(text: &str, max_calls: usize) -> Option<Vec<ToolCall>> {
    let value = extract_json(text)?;

    let entries: Vec<Value> = match value {
        Value::Array(items) => items,
        Value::Object(ref obj) => {
            match ["tool_calls", "calls", "tools"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_array))
            {
                Some(items) => items.clone(),
                None => vec![value],
            }
        }
        _ => return None,
    };

    let calls: Vec<ToolCall> = entries
        .iter()
        .filter_map(Value::as_object)
        .filter_map(call_from_object)
        .take(max_calls)
        .collect();

    if calls.is_empty() { None } else { Some(calls) }
}

fn call_from_object(obj: &Map<String, Value>) -> Option<ToolCall> {
    let tool = ["tool", "name"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())?;

    let args = ["args", "arguments", "parameters"]
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(|v| match v {
            Value::Object(map) => Some(map.clone()),
            // Some models double-encode arguments as a string
            Value::String(s) => serde_json::from_str::<Map<String, Value>>(s).ok(),
            _ => None,
        })
        .unwrap_or_default();

    let reason = ["reason", "rationale"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .unwrap_or_default();

    Some(ToolCall {
        tool: tool.to_string(),
        args,
        reason: reason.to_string(),
    })
}
