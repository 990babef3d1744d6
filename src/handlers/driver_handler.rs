// src/handlers/driver_handler.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    errors::KekeError as AppError,
    models::{
        driver::{Driver, DriverRegistration, DriverStatus},
        wallet::WithdrawalRequest,
    },
    services::driver_service::DriverOperations,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct DriverListQuery {
    pub status: Option<DriverStatus>,
}

pub async fn register_driver(
    State(state): State<Arc<AppState>>,
    Json(registration): Json<DriverRegistration>,
) -> Result<(StatusCode, Json<Driver>), AppError> {
    let driver = state.driver_service.register_driver(registration).await?;
    Ok((StatusCode::CREATED, Json(driver)))
}

pub async fn list_drivers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DriverListQuery>,
) -> Result<Json<Vec<Driver>>, AppError> {
    Ok(Json(state.driver_service.list_drivers(query.status).await?))
}

pub async fn get_driver(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Driver>, AppError> {
    state
        .driver_service
        .get_driver(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::driver_not_found(id))
}

pub async fn list_withdrawals(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<WithdrawalRequest>>, AppError> {
    Ok(Json(state.driver_service.get_driver_withdrawals(&id).await?))
}

pub async fn request_withdrawal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<WithdrawalRequest>), AppError> {
    let withdrawal = state.wallet_service.request_withdrawal(&id).await?;
    Ok((StatusCode::CREATED, Json(withdrawal)))
}
