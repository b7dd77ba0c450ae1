use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, ProviderKind};

#[derive(Parser, Debug)]
#[command(name = "autogenesis", version, about = "Turn a startup idea into a runnable Streamlit MVP")]
pub struct Args {
    /// TOML config file; environment variables and flags override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, global = true)]
    pub provider: Option<ProviderKind>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Write each stage's request and raw reply under `<output_dir>/.genesis/runs/`.
    #[arg(long, global = true, default_value_t = false)]
    pub save_transcripts: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API.
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        database: Option<PathBuf>,
    },
    /// Run the pipeline once and write the project to disk.
    Generate {
        #[arg(long)]
        idea: String,
        #[arg(long)]
        title: Option<String>,
        /// Also write `<title>.zip` next to the project directory.
        #[arg(long, default_value_t = false)]
        zip: bool,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

impl Args {
    /// Flags win over every other config layer.
    pub fn apply_to(&self, cfg: &mut Config) {
        if let Some(p) = self.provider {
            if p != cfg.provider && cfg.model == cfg.provider.default_model() {
                cfg.model = p.default_model().to_string();
            }
            cfg.provider = p;
        }
        if let Some(m) = &self.model {
            cfg.model = m.clone();
        }
        if let Some(t) = self.temperature {
            cfg.temperature = t;
        }
        if let Some(t) = self.timeout_secs {
            cfg.timeout_secs = t;
        }
        if self.save_transcripts {
            cfg.save_transcripts = true;
        }
        match &self.command {
            Command::Serve { bind, database } => {
                if let Some(b) = bind {
                    cfg.bind_addr = b.clone();
                }
                if let Some(d) = database {
                    cfg.database_path = d.display().to_string();
                }
            }
            Command::Generate { output_dir, .. } => {
                if let Some(o) = output_dir {
                    cfg.output_dir = o.display().to_string();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "autogenesis",
            "--provider",
            "ollama",
            "--model",
            "llama3.1",
            "generate",
            "--idea",
            "A cafe shop in Chandigarh.",
            "--zip",
            "--output-dir",
            "out",
        ]);
        let mut cfg = Config::default();
        args.apply_to(&mut cfg);
        assert_eq!(cfg.provider, ProviderKind::Ollama);
        assert_eq!(cfg.model, "llama3.1");
        assert_eq!(cfg.output_dir, "out");
        assert!(matches!(args.command, Command::Generate { zip: true, .. }));
    }

    #[test]
    fn switching_provider_switches_default_model() {
        let args = Args::parse_from(["autogenesis", "--provider", "openai", "serve"]);
        let mut cfg = Config::default();
        args.apply_to(&mut cfg);
        assert_eq!(cfg.model, "gpt-4.1-mini");
    }

    #[test]
    fn serve_keeps_defaults_without_flags() {
        let args = Args::parse_from(["autogenesis", "serve", "--bind", "0.0.0.0:9000"]);
        let mut cfg = Config::default();
        args.apply_to(&mut cfg);
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
        assert_eq!(cfg.provider, ProviderKind::Gemini);
        assert_eq!(cfg.database_path, "autogenesis.db");
    }
}
