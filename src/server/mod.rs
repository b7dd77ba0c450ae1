//! HTTP surface: accounts, projects and the advisor chat.

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

mod accounts;
mod advisor;
mod error;
mod projects;

pub use error::ApiError;
use error::ApiResult;

use crate::auth::TokenIssuer;
use crate::config::{Config, DEFAULT_JWT_SECRET};
use crate::mail::DynMailer;
use crate::orchestrator::Orchestrator;
use crate::provider::DynProvider;
use crate::store::Store;

/// Shared handles for every request. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Store>,
    pub provider: DynProvider,
    pub orchestrator: Orchestrator,
    pub mailer: DynMailer,
    pub tokens: TokenIssuer,
}

impl AppState {
    pub fn new(config: Config, store: Store, provider: DynProvider, mailer: DynMailer) -> Self {
        let mut orchestrator = Orchestrator::new(provider.clone());
        if config.save_transcripts {
            orchestrator = orchestrator.with_transcripts(PathBuf::from(&config.output_dir));
        }
        let tokens = TokenIssuer::new(&config.jwt_secret, config.access_token_minutes);
        Self { config: Arc::new(config), store: Arc::new(store), provider, orchestrator, mailer, tokens }
    }
}

/// Run SQLite or Argon2 work on the blocking pool so one request never stalls
/// the async workers serving the others.
pub(crate) async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

fn startup_warnings(config: &Config) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if config.allowed_origins.is_empty() {
        warnings.push("allowed_origins is empty; CORS accepts any origin");
    }
    if config.jwt_secret == DEFAULT_JWT_SECRET {
        warnings.push("jwt_secret is the built-in default; set JWT_SECRET before exposing the API");
    }
    warnings
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_DISPOSITION]);

    if allowed_origins.is_empty() {
        cors.allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<HeaderValue> = allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

async fn health() -> &'static str {
    "OK"
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/signup", post(accounts::signup))
        .route("/login", post(accounts::login))
        .route("/verify-otp", post(accounts::verify_otp))
        .route("/resend-otp", post(accounts::resend_otp))
        .route("/me", get(accounts::me))
        .route("/chat/history", get(advisor::history))
        .route("/chat", post(advisor::ask))
        .route("/generate", post(projects::generate))
        .route("/projects", get(projects::list))
        .route("/projects/{id}", get(projects::get).delete(projects::delete))
        .route("/projects/{id}/download", get(projects::download));

    let cors = cors_layer(&state.config.allowed_origins);
    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState) -> Result<()> {
    for warning in startup_warnings(&state.config) {
        tracing::warn!("{warning}");
    }
    let addr = state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;
    tracing::info!(%addr, provider = state.provider.name(), "AutoGenesis API listening");

    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not listen for ctrl-c");
    }
}
