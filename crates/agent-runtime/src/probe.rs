//! Connectivity Probes
//!
//! Raw HTTP requests against vendor endpoints, reported verbatim (status,
//! headers, a body preview) for debugging. Credentials are redacted.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;

/// Headers whose values must never appear in a report
const SECRET_HEADERS: &[&str] = &["authorization", "x-api-key", "xi-api-key", "api-key"];

const BODY_PREVIEW_CHARS: usize = 1000;

/// A request to probe
#[derive(Clone, Debug)]
pub struct ProbeTarget {
    pub name: String,
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ProbeTarget {
    pub fn get(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: reqwest::Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(name: impl Into<String>, url: impl Into<String>, body: Value) -> Self {
        Self {
            name: name.into(),
            method: reqwest::Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// What the vendor answered
#[derive(Clone, Debug, Serialize)]
pub struct ProbeReport {
    pub name: String,
    pub method: String,
    pub url: String,
    pub request_headers: BTreeMap<String, String>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Issue the probe. Never fails: transport errors land in `error`.
pub async fn probe(client: &reqwest::Client, target: &ProbeTarget, timeout: Duration) -> ProbeReport {
    let started = Instant::now();

    let mut request = client
        .request(target.method.clone(), &target.url)
        .timeout(timeout);
    for (name, value) in &target.headers {
        request = request.header(name, value);
    }
    if let Some(body) = &target.body {
        request = request.json(body);
    }

    let mut report = ProbeReport {
        name: target.name.clone(),
        method: target.method.to_string(),
        url: target.url.clone(),
        request_headers: target
            .headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), redact(k, v)))
            .collect(),
        ok: false,
        status: None,
        headers: BTreeMap::new(),
        body_preview: None,
        error: None,
        elapsed_ms: 0,
    };

    match request.send().await {
        Ok(response) => {
            let status = response.status();
            report.ok = status.is_success();
            report.status = Some(status.as_u16());
            report.headers = response
                .headers()
                .iter()
                .map(|(k, v)| {
                    let value = v.to_str().unwrap_or("<binary>");
                    (k.as_str().to_string(), redact(k.as_str(), value))
                })
                .collect();
            match response.text().await {
                Ok(body) => report.body_preview = Some(preview(&body)),
                Err(e) => report.error = Some(format!("Failed to read body: {e}")),
            }
        }
        Err(e) => {
            tracing::warn!(target = %target.name, error = %e, "Probe failed");
            report.error = Some(e.to_string());
        }
    }

    report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    report
}

fn redact(name: &str, value: &str) -> String {
    if SECRET_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
        "<redacted>".into()
    } else {
        value.to_string()
    }
}

fn preview(body: &str) -> String {
    match body.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((i, _)) => format!("{}…", &body[..i]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_secret_headers_are_redacted() {
        assert_eq!(redact("Authorization", "Bearer sk-123"), "<redacted>");
        assert_eq!(redact("xi-api-key", "abc"), "<redacted>");
        assert_eq!(redact("content-type", "application/json"), "application/json");
    }

    #[test]
    fn test_preview_is_bounded() {
        let long = "x".repeat(BODY_PREVIEW_CHARS + 50);
        let p = preview(&long);
        assert_eq!(p.chars().count(), BODY_PREVIEW_CHARS + 1);
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn test_unreachable_target_reports_error() {
        let client = reqwest::Client::new();
        let target = ProbeTarget::post("nowhere", "http://127.0.0.1:9/", json!({}))
            .header("Authorization", "Bearer secret");

        let report = probe(&client, &target, Duration::from_secs(2)).await;

        assert!(!report.ok);
        assert!(report.status.is_none());
        assert!(report.error.is_some());
        assert_eq!(report.request_headers["authorization"], "<redacted>");
        assert_eq!(report.method, "POST");
    }
}
