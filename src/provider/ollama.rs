use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::errors::{GenesisError, Result};
use crate::wire::CompletionRequest;
use super::Provider;

pub struct Ollama {
    model: String,
    url: String,
    temperature: f32,
    client: Client,
}

impl Ollama {
    pub fn new(model: String, url: String, temperature: f32, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { model, url, temperature, client })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a Value>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: String,
}

#[async_trait]
impl Provider for Ollama {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let url = format!("{}/api/chat", self.url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Msg { role: "system", content: &req.system },
                Msg { role: "user", content: &req.user },
            ],
            stream: false,
            // Ollama accepts a JSON schema directly as the output format.
            format: req.response_schema.as_ref(),
            options: OllamaOptions { temperature: self.temperature },
        };

        tracing::debug!(stage = %req.stage, %url, "POST ollama chat");

        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        tracing::trace!(stage = %req.stage, %status, raw = %text, "ollama response");

        if !status.is_success() {
            return Err(GenesisError::Provider(format!("ollama error ({status}): {text}")));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| GenesisError::Provider(format!("ollama response parse error: {e}")))?;
        Ok(parsed.message.content)
    }
}
