// src/handlers/session_handler.rs
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    errors::KekeError as AppError,
    models::user::{LoginRequest, LoginResponse, Session},
    services::user_service::UserOperations,
    state::AppState,
};

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(login): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    tracing::info!("POST /sessions - {:?}", login.role);
    Ok(Json(state.user_service.login(login).await?))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<Session>, AppError> {
    state
        .user_service
        .get_session(&token)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Session not found"))
}
