// src/handlers/health_handler.rs
use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "keke-napepe",
            "version": env!("CARGO_PKG_VERSION"),
            "assistant_model": state.ai_service.is_model_enabled(),
            "auto_dispatch": state.config.auto_dispatch,
        })),
    )
}
