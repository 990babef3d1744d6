// src/handlers/user_handler.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{
    errors::KekeError as AppError,
    models::{
        notification::Notification,
        order::DeliveryOrder,
        ride::Ride,
        user::{TopUpRequest, User, UserRegistration},
        wallet::WalletSummary,
    },
    services::{logistics_service::LogisticsOperations, ride_service::RideOperations, user_service::UserOperations},
    state::AppState,
};

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(registration): Json<UserRegistration>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.user_service.register_user(registration).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<User>, AppError> {
    state
        .user_service
        .get_user(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::user_not_found(id))
}

pub async fn top_up(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<TopUpRequest>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.wallet_service.top_up(&id, request.amount).await?))
}

pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WalletSummary>, AppError> {
    Ok(Json(state.wallet_service.wallet_summary(&id).await?))
}

pub async fn get_notifications(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Notification>>, AppError> {
    Ok(Json(state.user_service.get_notifications(&id).await?))
}

pub async fn get_rides(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Vec<Ride>>, AppError> {
    Ok(Json(state.ride_service.get_rides_for_user(&id).await?))
}

pub async fn get_orders(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DeliveryOrder>>, AppError> {
    Ok(Json(state.logistics_service.get_orders_for_customer(&id).await?))
}
