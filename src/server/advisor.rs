use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use super::error::{ApiError, ApiResult};
use super::{blocking, AppState};
use crate::auth::CurrentUser;
use crate::chat;
use crate::store::ChatMessage;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

pub async fn history(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<Json<Vec<ChatMessage>>> {
    let store = state.store.clone();
    Ok(Json(blocking(move || Ok(store.chat_history(&user.id)?)).await?))
}

pub async fn ask(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatMessage>> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Question must not be empty".into()));
    }
    let reply = chat::advise(&state.store, state.provider.as_ref(), &user.id, question).await?;
    Ok(Json(reply))
}
