// src/handlers/order_handler.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{
    errors::KekeError as AppError,
    models::order::{DeliveryOrder, OrderAdvance, OrderRequest},
    services::logistics_service::LogisticsOperations,
    state::AppState,
};

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OrderRequest>,
) -> Result<(StatusCode, Json<DeliveryOrder>), AppError> {
    let order = state.logistics_service.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeliveryOrder>, AppError> {
    state
        .logistics_service
        .get_order(&id)
        .await?
        .map(Json)
        .ok_or(AppError::OrderNotFound(id))
}

pub async fn track_order(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<DeliveryOrder>, AppError> {
    state
        .logistics_service
        .track_order(&code)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("No order with tracking code {}", code)))
}

pub async fn advance_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<OrderAdvance>>,
) -> Result<Json<DeliveryOrder>, AppError> {
    let advance = body.map(|Json(advance)| advance).unwrap_or_default();
    Ok(Json(state.logistics_service.advance_order(&id, advance).await?))
}

pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeliveryOrder>, AppError> {
    Ok(Json(state.logistics_service.cancel_order(&id).await?))
}
