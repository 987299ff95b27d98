//! Health and status handlers

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::inference::EngineStatus;
use crate::AppState;

pub async fn check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Serialize)]
pub struct StatusResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
    #[serde(flatten)]
    engine: EngineStatus,
    llm_providers: Vec<String>,
    cache_backend: Option<&'static str>,
    timestamp: i64,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        engine: state.artifacts.status(),
        llm_providers: state.agent.provider_names(),
        cache_backend: state.agent.cache_backend(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
