//! The "Genesis" advisor: one question in, one stored reply out.

use std::sync::Arc;
use thiserror::Error;

use crate::errors::GenesisError;
use crate::prompt::{system_prompt_advisor, user_prompt_advisor};
use crate::provider::Provider;
use crate::store::{ChatMessage, Sender, Store, StoreError, StoreResult};
use crate::wire::CompletionRequest;

pub const STAGE: &str = "advisor";
/// How many prior messages (including the new question) the model sees.
pub const HISTORY_WINDOW: usize = 10;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Model(#[from] GenesisError),
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// SQLite calls run on the blocking pool, away from the async workers.
async fn on_store<T, F>(store: &Arc<Store>, f: F) -> Result<T, ChatError>
where
    F: FnOnce(&Store) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    Ok(tokio::task::spawn_blocking(move || f(&store)).await??)
}

/// Store the question, ask the advisor with the recent conversation as
/// context, store and return the reply.
///
/// The question stays in history even when the model call fails.
pub async fn advise(
    store: &Arc<Store>,
    provider: &dyn Provider,
    user_id: &str,
    question: &str,
) -> Result<ChatMessage, ChatError> {
    let (uid, q) = (user_id.to_string(), question.to_string());
    let mut recent = on_store(store, move |s| {
        s.append_message(&uid, Sender::User, &q)?;
        s.recent_messages(&uid, HISTORY_WINDOW)
    })
    .await?;
    // The newest entry is the question itself; it goes in separately.
    recent.pop();

    let req = CompletionRequest::text(STAGE, system_prompt_advisor(), user_prompt_advisor(&recent, question));
    let reply = provider.complete(&req).await?;
    let reply = reply.trim().to_string();

    tracing::info!(%user_id, reply_chars = reply.len(), "advisor replied");
    let uid = user_id.to_string();
    on_store(store, move |s| s.append_message(&uid, Sender::Ai, &reply)).await
}
