use async_trait::async_trait;
use fs_err as fs;
use serde_json::{json, to_string_pretty};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::errors::Result;
use crate::provider::{DynProvider, Provider};
use crate::wire::CompletionRequest;

pub struct SavedPaths {
    pub request: PathBuf,
    pub response: PathBuf,
}

pub fn run_dir(root: &Path, run: Uuid) -> PathBuf {
    root.join(".genesis").join("runs").join(run.to_string())
}

/// Write one stage's request and raw reply as pretty JSON under `dir`.
pub fn save_stage(dir: &Path, req: &CompletionRequest, raw: &str) -> anyhow::Result<SavedPaths> {
    fs::create_dir_all(dir)?;

    let request = dir.join(format!("{}.request.json", req.stage));
    fs::write(&request, to_string_pretty(req)?)?;

    let response = dir.join(format!("{}.response.json", req.stage));
    fs::write(&response, to_string_pretty(&json!({ "stage": req.stage, "raw": raw }))?)?;

    Ok(SavedPaths { request, response })
}

/// Provider wrapper that records every exchange of one run to disk.
/// Failing to write a transcript never fails the run.
pub struct TranscriptRecorder {
    inner: DynProvider,
    dir: PathBuf,
}

impl TranscriptRecorder {
    pub fn new(inner: DynProvider, dir: PathBuf) -> Self {
        Self { inner, dir }
    }
}

#[async_trait]
impl Provider for TranscriptRecorder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let raw = self.inner.complete(req).await?;
        match save_stage(&self.dir, req, &raw) {
            Ok(saved) => tracing::debug!(
                stage = %req.stage,
                request = %saved.request.display(),
                response = %saved.response.display(),
                "transcript saved"
            ),
            Err(e) => tracing::warn!(stage = %req.stage, error = %e, "could not save transcript"),
        }
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::scripted::ScriptedProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn recorder_writes_request_and_response() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = run_dir(tmp.path(), Uuid::new_v4());
        let rec = TranscriptRecorder::new(Arc::new(ScriptedProvider::new(["print('hi')"])), dir.clone());

        let req = CompletionRequest::text("engineering", "sys".into(), "usr".into());
        assert_eq!(rec.complete(&req).await.unwrap(), "print('hi')");

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("engineering.response.json")).unwrap()).unwrap();
        assert_eq!(saved["raw"], "print('hi')");
        assert!(dir.join("engineering.request.json").exists());
    }
}
