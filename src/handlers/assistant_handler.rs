// src/handlers/assistant_handler.rs
use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{
    errors::KekeError as AppError,
    services::ai_service::{ChatReply, ChatRequest, TripEstimateReply, TripEstimateRequest},
    state::AppState,
};

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::MissingRequiredField("message".to_string()));
    }
    Ok(Json(state.ai_service.chat(&request.message).await))
}

pub async fn estimate_trip(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TripEstimateRequest>,
) -> Result<Json<TripEstimateReply>, AppError> {
    if request.pickup.trim().is_empty() || request.dropoff.trim().is_empty() {
        return Err(AppError::bad_request("Both pickup and dropoff are required"));
    }
    Ok(Json(state.ai_service.estimate_trip(&request.pickup, &request.dropoff).await))
}
