use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::agents::{design, engineering, product};
use crate::errors::Result;
use crate::log::{run_dir, TranscriptRecorder};
use crate::provider::DynProvider;
use crate::wire::GenerationResult;

/// Drives product → design → engineering for one idea.
///
/// Holds only the injected provider handle; every run owns its own
/// intermediate values, so concurrent runs need no coordination.
#[derive(Clone)]
pub struct Orchestrator {
    provider: DynProvider,
    transcripts: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(provider: DynProvider) -> Self {
        Self { provider, transcripts: None }
    }

    /// Record every stage's request/response under `root/.genesis/runs/<run>/`.
    pub fn with_transcripts(mut self, root: PathBuf) -> Self {
        self.transcripts = Some(root);
        self
    }

    pub async fn run(&self, idea: &str) -> Result<GenerationResult> {
        self.run_timed(idea).await.map(|(result, _)| result)
    }

    /// Like [`run`](Self::run), also returning wall-clock duration. The
    /// duration is observational only.
    pub async fn run_timed(&self, idea: &str) -> Result<(GenerationResult, Duration)> {
        let run_id = Uuid::new_v4();
        let provider: DynProvider = match &self.transcripts {
            Some(root) => Arc::new(TranscriptRecorder::new(self.provider.clone(), run_dir(root, run_id))),
            None => self.provider.clone(),
        };
        let provider = provider.as_ref();

        tracing::info!(%run_id, provider = provider.name(), idea, "generation run started");
        let started = Instant::now();

        let product_plan = stage(product::STAGE, product::run(provider, idea)).await?;
        let design_plan = stage(design::STAGE, design::run(provider, &product_plan.mvp_features)).await?;
        let generated_source =
            stage(engineering::STAGE, engineering::run(provider, &product_plan, &design_plan)).await?;

        let elapsed = started.elapsed();
        tracing::info!(
            %run_id,
            product = %product_plan.product_name,
            elapsed_secs = format_args!("{:.2}", elapsed.as_secs_f64()),
            "generation run complete"
        );

        Ok((GenerationResult { product_plan, design_plan, generated_source }, elapsed))
    }
}

async fn stage<T>(name: &'static str, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    tracing::info!(stage = name, "stage started");
    let started = Instant::now();
    match fut.await {
        Ok(v) => {
            tracing::info!(stage = name, elapsed_ms = started.elapsed().as_millis() as u64, "stage finished");
            Ok(v)
        }
        Err(e) => {
            tracing::error!(stage = name, error = %e, "stage failed; aborting run");
            Err(e)
        }
    }
}
