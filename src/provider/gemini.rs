use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::errors::{GenesisError, Result};
use crate::wire::CompletionRequest;
use super::Provider;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini over the public `generateContent` REST endpoint.
pub struct GeminiProvider {
    model: String,
    api_key: Option<String>,
    temperature: f32,
    client: Client,
}

impl GeminiProvider {
    pub fn new(model: String, api_key: Option<String>, temperature: f32, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { model, api_key, temperature, client })
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

fn request_body(req: &CompletionRequest, temperature: f32) -> Value {
    let mut generation_config = json!({ "temperature": temperature });
    if let Some(schema) = &req.response_schema {
        generation_config["responseMimeType"] = json!("application/json");
        generation_config["responseSchema"] = schema.clone();
    }
    json!({
        "systemInstruction": { "parts": [{ "text": req.system }] },
        "contents": [{ "role": "user", "parts": [{ "text": req.user }] }],
        "generationConfig": generation_config,
    })
}

fn first_candidate_text(resp: GenerateResponse) -> Result<String> {
    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GenesisError::provider("gemini returned no candidates"))?;
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
        return Err(GenesisError::Provider(format!("gemini returned empty content (finish reason: {reason})")));
    }
    Ok(text)
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenesisError::provider("GOOGLE_API_KEY is not set"))?;
        let url = format!("{API_BASE}/models/{}:generateContent", self.model);
        let body = request_body(req, self.temperature);

        tracing::debug!(stage = %req.stage, model = %self.model, "POST gemini generateContent");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        tracing::trace!(stage = %req.stage, %status, raw = %text, "gemini response");

        if !status.is_success() {
            return Err(GenesisError::Provider(format!("gemini API error ({status}): {text}")));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| GenesisError::Provider(format!("failed to parse gemini response: {e}")))?;
        first_candidate_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::product_plan_schema;

    #[test]
    fn structured_requests_ask_for_json() {
        let req = CompletionRequest::structured("product", "sys".into(), "idea".into(), product_plan_schema());
        let body = request_body(&req, 0.2);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["required"][0], "product_name");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
    }

    #[test]
    fn text_requests_have_no_schema() {
        let req = CompletionRequest::text("engineering", "sys".into(), "plans".into());
        let body = request_body(&req, 0.2);
        assert!(body["generationConfig"].get("responseSchema").is_none());
        assert_eq!(body["contents"][0]["parts"][0]["text"], "plans");
    }

    #[test]
    fn parts_are_concatenated() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "import " }, { "text": "streamlit" }] } }]
        }))
        .unwrap();
        assert_eq!(first_candidate_text(resp).unwrap(), "import streamlit");
    }

    #[test]
    fn blocked_candidate_is_a_provider_error() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        let err = first_candidate_text(resp).unwrap_err();
        assert!(matches!(err, GenesisError::Provider(ref m) if m.contains("SAFETY")));
    }
}
