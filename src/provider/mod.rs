use anyhow::{anyhow, Result as AnyResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ProviderKind};
use crate::errors::Result;
use crate::wire::CompletionRequest;

pub mod gemini;
pub mod ollama;
pub mod openai;
#[cfg(test)]
pub mod scripted;

/// One completion call against a language model.
///
/// Implementations return the raw text of the reply. Structured requests carry
/// a schema in `req.response_schema`; parsing and validation happen upstream.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, req: &CompletionRequest) -> Result<String>;
}

pub type DynProvider = Arc<dyn Provider>;

pub fn make_provider(cfg: &Config) -> AnyResult<DynProvider> {
    let timeout = Duration::from_secs(cfg.timeout_secs);
    match cfg.provider {
        ProviderKind::Gemini => Ok(Arc::new(gemini::GeminiProvider::new(
            cfg.model.clone(),
            cfg.google_api_key.clone(),
            cfg.temperature,
            timeout,
        )?)),
        ProviderKind::OpenAI => Ok(Arc::new(openai::OpenAIProvider::new(
            cfg.model.clone(),
            cfg.openai_api_key.clone(),
            cfg.temperature,
            timeout,
        )?)),
        ProviderKind::Ollama => {
            let url = cfg
                .ollama_url
                .clone()
                .ok_or_else(|| anyhow!("provider is ollama but ollama_url is not set"))?;
            Ok(Arc::new(ollama::Ollama::new(cfg.model.clone(), url, cfg.temperature, timeout)?))
        }
    }
}
