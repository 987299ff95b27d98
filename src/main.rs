//! Fraud Explainer Server
//!
//! Scores card transactions with a pre-trained classifier, attributes the
//! score to individual features and narrates the result through an LLM.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    FRAUD EXPLAINER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────────┐  ┌─────────────────────┐ │
//! │  │  API      │  │  Inference    │  │  Explanation Agent  │ │
//! │  │  (Axum)   │─▶│  (ONNX, SHAP) │─▶│  (OpenAI / Gemini)  │ │
//! │  └───────────┘  └───────────────┘  └──────────┬──────────┘ │
//! │                                               ▼            │
//! │                                     ┌─────────────────┐    │
//! │                                     │ Redis / memory  │    │
//! │                                     └─────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod cache;
mod config;
mod error;
mod explain;
mod handlers;
mod inference;
mod llm;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::explain::ExplanationAgent;
use crate::inference::ModelArtifacts;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "fraud_explainer=debug,tower_http=debug".into()))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // Load configuration
    let config = config::Config::from_env();

    tracing::info!("Fraud Explainer starting ({})...", config.environment);

    // Load model artifacts
    let artifacts = match ModelArtifacts::load(&config.artifacts) {
        Ok(artifacts) => artifacts,
        Err(e) => {
            tracing::error!("Failed to load model artifacts: {}", e);
            return Err(e).context("Failed to load model artifacts");
        }
    };
    tracing::info!(
        model = %config.artifacts.model_path,
        attribution = artifacts.has_attribution(),
        "Model artifacts loaded"
    );

    // Explanation pipeline
    let cache = cache::from_config(&config.cache);
    let client = llm::build_http_client(config.llm.timeout)
        .context("Failed to build HTTP client")?;
    let providers = llm::providers_from_config(&config.llm, client);
    if providers.is_empty() {
        tracing::warn!("No LLM provider configured, explanations will use the fallback text");
    }
    let agent = ExplanationAgent::new(providers, cache, config.cache.ttl);

    // Build application state
    let state = AppState {
        config: config.clone(),
        artifacts: Arc::new(artifacts),
        agent: Arc::new(agent),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub artifacts: Arc<ModelArtifacts>,
    pub agent: Arc<ExplanationAgent>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/status", get(handlers::health::status))
        .route("/predict_and_explain", post(handlers::predict::predict_and_explain))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
