use anyhow::{Context, Result};
use clap::ValueEnum;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(alias = "google")]
    Gemini,
    #[value(name = "openai", alias = "open-ai")]
    OpenAI,
    Ollama,
}

impl ProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-1.5-flash",
            ProviderKind::OpenAI => "gpt-4.1-mini",
            ProviderKind::Ollama => "llama3.1",
        }
    }
}

/// Development-only signing key; `serve` warns while it is in use.
pub const DEFAULT_JWT_SECRET: &str = "a_very_secret_key_for_autogenesis";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: String,
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub ollama_url: Option<String>,
    pub database_path: String,
    pub output_dir: String,
    pub save_transcripts: bool,
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub otp_minutes: i64,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub email_sender: Option<String>,
    #[serde(skip_serializing)]
    pub email_password: Option<String>,
    /// Empty means any origin (development).
    pub allowed_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub google_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".into(),
            provider: ProviderKind::Gemini,
            model: ProviderKind::Gemini.default_model().into(),
            temperature: 0.2,
            timeout_secs: 600,
            ollama_url: Some("http://localhost:11434".into()),
            database_path: "autogenesis.db".into(),
            output_dir: "output".into(),
            save_transcripts: false,
            jwt_secret: DEFAULT_JWT_SECRET.into(),
            access_token_minutes: 30,
            otp_minutes: 10,
            smtp_host: "smtp.gmail.com".into(),
            smtp_port: 465,
            email_sender: None,
            email_password: None,
            allowed_origins: Vec::new(),
            google_api_key: None,
            openai_api_key: None,
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then `.env` and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_toml(&fs::read_to_string(p)?)
                .with_context(|| format!("invalid config file {}", p.display()))?,
            None => Self::default(),
        };
        dotenv::dotenv().ok();
        cfg.apply_env(|key| env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Overlay values from an environment lookup. Unknown or unparsable
    /// values are ignored and the previous value is kept.
    pub fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("AUTOGENESIS_BIND") {
            self.bind_addr = v;
        }
        if let Some(v) = get("AUTOGENESIS_PROVIDER").and_then(|v| ProviderKind::from_str(&v, true).ok()) {
            if v != self.provider && self.model == self.provider.default_model() {
                self.model = v.default_model().to_string();
            }
            self.provider = v;
        }
        if let Some(v) = get("AUTOGENESIS_MODEL") {
            self.model = v;
        }
        if let Some(v) = get("AUTOGENESIS_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.temperature = v;
        }
        if let Some(v) = get("AUTOGENESIS_DATABASE") {
            self.database_path = v;
        }
        if let Some(v) = get("AUTOGENESIS_OUTPUT_DIR") {
            self.output_dir = v;
        }
        if let Some(v) = get("OLLAMA_URL") {
            self.ollama_url = Some(v);
        }
        if let Some(v) = get("JWT_SECRET") {
            self.jwt_secret = v;
        }
        if let Some(v) = get("ALLOWED_ORIGINS") {
            self.allowed_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = get("SMTP_HOST") {
            self.smtp_host = v;
        }
        if let Some(v) = get("SMTP_PORT").and_then(|v| v.parse().ok()) {
            self.smtp_port = v;
        }
        if let Some(v) = get("EMAIL_SENDER") {
            self.email_sender = Some(v);
        }
        if let Some(v) = get("EMAIL_PASSWORD") {
            self.email_password = Some(v);
        }
        if let Some(v) = get("GOOGLE_API_KEY") {
            self.google_api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai_api_key = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn toml_overrides_only_what_it_names() {
        let cfg = Config::from_toml("provider = \"openai\"\nmodel = \"gpt-4.1-mini\"\n").unwrap();
        assert_eq!(cfg.provider, ProviderKind::OpenAI);
        assert_eq!(cfg.model, "gpt-4.1-mini");
        assert_eq!(cfg.access_token_minutes, 30);
        assert_eq!(cfg.otp_minutes, 10);
    }

    #[test]
    fn env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("AUTOGENESIS_PROVIDER", "OLLAMA"),
            ("AUTOGENESIS_TEMPERATURE", "not-a-number"),
            ("ALLOWED_ORIGINS", "http://localhost:5173, ,https://app.example"),
            ("GOOGLE_API_KEY", "k"),
        ]
        .into_iter()
        .collect();
        let mut cfg = Config::default();
        cfg.apply_env(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.provider, ProviderKind::Ollama);
        assert_eq!(cfg.model, "llama3.1");
        assert_eq!(cfg.temperature, 0.2);
        assert_eq!(cfg.allowed_origins, vec!["http://localhost:5173", "https://app.example"]);
        assert_eq!(cfg.google_api_key.as_deref(), Some("k"));
    }

    #[test]
    fn secrets_are_not_serialized() {
        let cfg = Config { openai_api_key: Some("sk-secret".into()), ..Config::default() };
        let text = toml::to_string(&cfg).unwrap();
        assert!(!text.contains("sk-secret"));
    }
}
