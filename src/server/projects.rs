use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use super::error::{ApiError, ApiResult};
use super::{blocking, AppState};
use crate::auth::CurrentUser;
use crate::package::{archive_from, PackageInput};
use crate::store::Project;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub idea: String,
    pub title: Option<String>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Project not found".into())
}

async fn owned_project(state: &AppState, owner_id: String, id: String) -> ApiResult<Project> {
    let store = state.store.clone();
    blocking(move || Ok(store.get_project(&owner_id, &id)?)).await?.ok_or_else(not_found)
}

/// Runs the full pipeline, then stores the project. Nothing is stored when
/// any stage fails.
pub async fn generate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<Json<Project>> {
    let idea = req.idea.trim();
    if idea.is_empty() {
        return Err(ApiError::BadRequest("Idea must not be empty".into()));
    }

    let (result, elapsed) = state.orchestrator.run_timed(idea).await?;
    let title = req
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&result.product_plan.product_name)
        .to_string();

    let (store, owner_id, idea) = (state.store.clone(), user.id.clone(), idea.to_string());
    let project = blocking(move || Ok(store.insert_project(&owner_id, &idea, Some(&title), &result)?)).await?;
    tracing::info!(
        user_id = %user.id,
        project_id = %project.id,
        elapsed_ms = elapsed.as_millis() as u64,
        "project generated"
    );
    Ok(Json(project))
}

pub async fn list(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<Json<Vec<Project>>> {
    let store = state.store.clone();
    Ok(Json(blocking(move || Ok(store.list_projects(&user.id)?)).await?))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    owned_project(&state, user.id, id).await.map(Json)
}

pub async fn download(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let project = owned_project(&state, user.id, id).await?;
    let archive = archive_from(&PackageInput {
        product_plan: project.product_plan.as_ref(),
        design_plan: project.design_plan.as_ref(),
        source: project.generated_code.as_deref().unwrap_or_default(),
        idea: &project.idea,
        title: project.title.as_deref().unwrap_or_default(),
    })?;

    let disposition = format!("attachment; filename=\"{}\"", archive.file_name);
    Ok((
        [(header::CONTENT_TYPE, "application/zip".to_string()), (header::CONTENT_DISPOSITION, disposition)],
        archive.bytes,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let store = state.store.clone();
    if blocking(move || Ok(store.delete_project(&user.id, &id)?)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}
