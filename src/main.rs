use anyhow::Result;
use chrono::Local;
use clap::Parser;
use fs_err as fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod agents;
mod auth;
mod chat;
mod cli;
mod config;
mod errors;
mod fence;
mod log;
mod mail;
mod orchestrator;
mod package;
mod prompt;
mod provider;
mod server;
mod store;
mod structured;
mod ux;
mod wire;

use cli::Command;
use orchestrator::Orchestrator;
use package::PackageInput;

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    init_tracing(match args.command {
        Command::Serve { .. } => "info",
        Command::Generate { .. } => "warn",
    });

    let mut cfg = config::Config::load(args.config.as_deref())?;
    args.apply_to(&mut cfg);
    let provider = provider::make_provider(&cfg)?;

    match &args.command {
        Command::Serve { .. } => {
            let store = store::Store::open(&cfg.database_path)?;
            let mailer = mail::make_mailer(&cfg)?;
            server::serve(server::AppState::new(cfg, store, provider, mailer)).await
        }
        Command::Generate { idea, title, zip, .. } => {
            let mut orch = Orchestrator::new(provider);
            if cfg.save_transcripts {
                orch = orch.with_transcripts(PathBuf::from(&cfg.output_dir));
            }
            generate(&orch, &cfg, idea, title.as_deref(), *zip).await
        }
    }
}

async fn generate(orch: &Orchestrator, cfg: &config::Config, idea: &str, title: Option<&str>, zip: bool) -> Result<()> {
    ux::banner(idea);
    let pb = ux::spinner("Product → Design → Engineering");
    let outcome = orch.run_timed(idea).await;
    pb.finish_and_clear();

    let (result, elapsed) = match outcome {
        Ok(v) => v,
        Err(e) => {
            ux::show_error(&e);
            return Err(e.into());
        }
    };
    ux::show_product_plan(&result.product_plan);
    ux::show_design_plan(&result.design_plan);

    let title = title.unwrap_or(&result.product_plan.product_name);
    let input = PackageInput::from_result(&result, idea, title);
    let out_root = PathBuf::from(&cfg.output_dir);
    let dir = package::export_to_dir(&input, &out_root, Local::now())?;

    let archive_path = if zip {
        let archive = package::archive_from(&input)?;
        let path = out_root.join(&archive.file_name);
        fs::write(&path, &archive.bytes)?;
        Some((path, archive.bytes.len()))
    } else {
        None
    };

    ux::show_outcome(
        &dir,
        archive_path.as_ref().map(|(p, n)| (p.as_path(), *n)),
        result.generated_source.len(),
        elapsed,
    );
    Ok(())
}
