// src/handlers/ride_handler.rs
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
        pricing::{FareQuote, VehicleType},
        ride::{CancelRequest, DriverAction, Ride, RideEstimateRequest, RideRequest},
    },
    services::ride_service::RideOperations,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct OpenRidesQuery {
    pub vehicle_type: Option<VehicleType>,
}

pub async fn estimate_ride(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RideEstimateRequest>,
) -> Result<Json<FareQuote>, AppError> {
    Ok(Json(state.pricing_service.estimate_ride(&request).await?))
}

pub async fn book_ride(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RideRequest>,
) -> Result<(StatusCode, Json<Ride>), AppError> {
    tracing::info!("POST /rides - passenger {}", request.passenger_id);
    let ride = state.ride_service.book_ride(request).await?;
    Ok((StatusCode::CREATED, Json(ride)))
}

/// Requests still waiting for a driver, oldest first.
pub async fn list_open_rides(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OpenRidesQuery>,
) -> Result<Json<Vec<Ride>>, AppError> {
    Ok(Json(state.ride_service.list_pending_rides(query.vehicle_type).await?))
}

pub async fn get_ride(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Ride>, AppError> {
    state
        .ride_service
        .get_ride(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::ride_not_found(id))
}

pub async fn cancel_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<Ride>, AppError> {
    let reason = body.and_then(|Json(request)| request.reason);
    Ok(Json(state.ride_service.cancel_ride(&id, reason).await?))
}

pub async fn accept_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(action): Json<DriverAction>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(state.ride_service.accept_ride(&id, &action.driver_id).await?))
}

pub async fn mark_arrived(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(action): Json<DriverAction>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(state.ride_service.mark_arrived(&id, &action.driver_id).await?))
}

pub async fn start_trip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(action): Json<DriverAction>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(state.ride_service.start_trip(&id, &action.driver_id).await?))
}

pub async fn complete_trip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(action): Json<DriverAction>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(state.ride_service.complete_trip(&id, &action.driver_id).await?))
}
