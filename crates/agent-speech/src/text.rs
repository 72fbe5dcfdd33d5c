//! Speech Text Preparation
//!
//! Synthesizers read markdown literally ("asterisk asterisk"), so formatting
//! is stripped and the text cut at a sentence boundary under the length cap.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, SpeechError};

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("link regex is valid"));

static HEADING_OR_BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:#{1,6}\s+|[-*+]\s+|\d+\.\s+|>\s*)").expect("line prefix regex is valid")
});

static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_`~]+").expect("emphasis regex is valid"));

/// Strip markdown, collapse whitespace, and cap at `max_chars`
pub fn prepare_text(raw: &str, max_chars: usize) -> Result<String> {
    let text = LINK.replace_all(raw, "$1");
    let text = HEADING_OR_BULLET.replace_all(&text, "");
    let text = EMPHASIS.replace_all(&text, "");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.is_empty() {
        return Err(SpeechError::EmptyText);
    }
    Ok(truncate_at_sentence(&text, max_chars))
}

fn truncate_at_sentence(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let head = &text[..cut];

    if let Some(end) = head.rfind(['.', '!', '?']) {
        // Keep the sentence only if it leaves a reasonable amount of text
        if end >= cut / 2 {
            return head[..=end].to_string();
        }
    }
    match head.rfind(' ') {
        Some(space) => format!("{}…", head[..space].trim_end()),
        None => format!("{head}…"),
    }
}
