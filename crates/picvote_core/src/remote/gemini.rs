//! Gemini-backed image analysis.
//!
//! # Responsibility
//! - Send one image plus the contest prompt to `generateContent`.
//! - Decode the structured JSON reply into an `AnalysisSuggestion`.
//!
//! # Invariants
//! - Every failure path (transport, HTTP status, decode) returns `None`
//!   after a `warn` event; the submission form then asks for manual input.
//! - The API key never appears in log output.

use crate::model::entry::Category;
use crate::remote::{AnalysisSuggestion, ImageAnalyzer};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const ANALYSIS_PROMPT: &str = "Analyze this photo for a photography contest.
1. Suggest a creative title.
2. Provide 3-4 descriptive tags.
3. Write a professional, brief (1-2 sentences) critique of its composition or mood.
4. Categorize it into one of: Nature, Urban, Minimalist, Portrait, Cozy.";

/// Analyzer calling the Gemini REST API.
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiAnalyzer {
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            api_key: api_key.into(),
        }
    }

    /// Points the analyzer at a different API root (proxies, test servers).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, payload: &Value) -> Result<Value, String> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(payload)
            .send()
            .await
            .map_err(|err| format!("HTTP request failed: {}", err.without_url()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|err| format!("failed to read response: {}", err.without_url()))?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(format!("Gemini API error: {message}"));
        }
        Ok(body)
    }
}

#[async_trait]
impl ImageAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, image: &[u8], mime_type: &str) -> Option<AnalysisSuggestion> {
        let payload = build_request_payload(image, mime_type);
        let body = match self.request(&payload).await {
            Ok(body) => body,
            Err(message) => {
                warn!(
                    "event=image_analysis module=analysis status=error model={} error={}",
                    self.model, message
                );
                return None;
            }
        };

        match parse_response(&body) {
            Ok(suggestion) => {
                debug!(
                    "event=image_analysis module=analysis status=ok model={} category={} tag_count={}",
                    self.model,
                    suggestion.category,
                    suggestion.tags.len()
                );
                Some(suggestion)
            }
            Err(message) => {
                warn!(
                    "event=image_analysis module=analysis status=error model={} error={}",
                    self.model, message
                );
                None
            }
        }
    }
}

/// Analyzer used when no API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAnalyzer;

#[async_trait]
impl ImageAnalyzer for DisabledAnalyzer {
    async fn analyze(&self, _image: &[u8], _mime_type: &str) -> Option<AnalysisSuggestion> {
        debug!("event=image_analysis module=analysis status=skipped reason=disabled");
        None
    }
}

fn build_request_payload(image: &[u8], mime_type: &str) -> Value {
    json!({
        "contents": [{
            "parts": [
                { "text": ANALYSIS_PROMPT },
                {
                    "inlineData": {
                        "mimeType": mime_type,
                        "data": BASE64.encode(image),
                    }
                }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "tags": { "type": "ARRAY", "items": { "type": "STRING" } },
                    "critique": { "type": "STRING" },
                    "category": { "type": "STRING" }
                },
                "required": ["title", "tags", "critique", "category"]
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    title: String,
    tags: Vec<String>,
    critique: String,
    category: String,
}

fn parse_response(body: &Value) -> Result<AnalysisSuggestion, String> {
    let text = body["candidates"][0]["content"]["parts"]
        .as_array()
        .and_then(|parts| parts.iter().find_map(|part| part["text"].as_str()))
        .ok_or_else(|| "response has no text part".to_string())?;

    let raw: RawSuggestion = serde_json::from_str(text)
        .map_err(|err| format!("response text is not the expected JSON: {err}"))?;

    // The model occasionally invents categories; fall back to the form default.
    let category = raw.category.parse::<Category>().unwrap_or_default();

    Ok(AnalysisSuggestion {
        title: raw.title,
        tags: raw.tags,
        critique: raw.critique,
        category,
    })
}

#[cfg(test)]
mod tests {
    use super::{build_request_payload, parse_response, DisabledAnalyzer};
    use crate::model::entry::Category;
    use crate::remote::ImageAnalyzer;
    use serde_json::json;

    #[test]
    fn payload_inlines_base64_image_and_schema() {
        let payload = build_request_payload(b"abc", "image/png");
        let inline = &payload["contents"][0]["parts"][1]["inlineData"];
        assert_eq!(inline["mimeType"], "image/png");
        assert_eq!(inline["data"], "YWJj");
        assert_eq!(
            payload["generationConfig"]["responseSchema"]["required"],
            json!(["title", "tags", "critique", "category"])
        );
    }

    #[test]
    fn parses_structured_reply() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "text": "{\"title\":\"Quiet Peak\",\"tags\":[\"Snow\",\"Ridge\"],\"critique\":\"Strong silhouette.\",\"category\":\"nature\"}"
                    }]
                }
            }]
        });

        let suggestion = parse_response(&body).unwrap();
        assert_eq!(suggestion.title, "Quiet Peak");
        assert_eq!(suggestion.tags, vec!["Snow", "Ridge"]);
        assert_eq!(suggestion.category, Category::Nature);
    }

    #[test]
    fn unknown_category_falls_back_to_default() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "text": "{\"title\":\"T\",\"tags\":[],\"critique\":\"C\",\"category\":\"Abstract\"}"
                    }]
                }
            }]
        });
        assert_eq!(parse_response(&body).unwrap().category, Category::Nature);
    }

    #[test]
    fn missing_text_part_is_an_error() {
        let body = json!({ "candidates": [] });
        assert!(parse_response(&body).is_err());

        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "not json" }] } }]
        });
        assert!(parse_response(&body).is_err());
    }

    #[tokio::test]
    async fn disabled_analyzer_never_suggests() {
        assert!(DisabledAnalyzer.analyze(b"img", "image/jpeg").await.is_none());
    }
}
