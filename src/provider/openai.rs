use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::errors::{GenesisError, Result};
use crate::wire::CompletionRequest;

const API_BASE: &str = "https://api.openai.com";

pub struct OpenAIProvider {
    model: String,
    api_key: Option<String>,
    temperature: f32,
    client: Client,
}

impl OpenAIProvider {
    pub fn new(model: String, api_key: Option<String>, temperature: f32, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { model, api_key, temperature, client })
    }
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[async_trait]
impl super::Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenesisError::provider("OPENAI_API_KEY is not set"))?;

        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": req.system },
                { "role": "user", "content": req.user }
            ],
            "temperature": self.temperature,
        });
        if req.wants_json() {
            // Force a valid JSON object; the schema itself travels in the system prompt.
            body["response_format"] = json!({ "type": "json_object" });
        }

        tracing::debug!(stage = %req.stage, model = %self.model, "POST /v1/chat/completions");

        let resp = self
            .client
            .post(format!("{API_BASE}/v1/chat/completions"))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        tracing::trace!(stage = %req.stage, %status, raw = %text, "openai response");

        if !status.is_success() {
            return Err(GenesisError::Provider(format!("OpenAI API error ({status}): {text}")));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| GenesisError::Provider(format!("failed to parse OpenAI response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenesisError::provider("OpenAI returned no choices"))
    }
}
