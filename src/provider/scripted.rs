//! Test double that replays canned replies in order and records every request.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::errors::{GenesisError, Result};
use crate::wire::CompletionRequest;
use super::Provider;

#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_error(&self, err: GenesisError) {
        self.replies.lock().push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        self.requests.lock().push(req.clone());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(GenesisError::provider("script exhausted")))
    }
}
