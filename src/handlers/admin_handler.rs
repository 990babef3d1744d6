// src/handlers/admin_handler.rs
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

use crate::{
    errors::KekeError as AppError,
    models::{
        driver::{Driver, DriverStatusUpdate},
        fraud::{AssessmentRequest, FraudAlert, RiskAssessment},
        pricing::{PlatformSettings, SettingsUpdate},
        wallet::{WithdrawalRequest, WithdrawalStatus},
    },
    services::{admin_service::PlatformStats, driver_service::DriverOperations, scheduler_service::JobInfo},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct WithdrawalQuery {
    pub status: Option<WithdrawalStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    #[serde(default)]
    pub include_resolved: bool,
}

#[derive(Debug, Deserialize)]
pub struct JobUpdate {
    pub enabled: Option<bool>,
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct AssessmentResponse {
    pub assessment: RiskAssessment,
    pub alert: Option<FraudAlert>,
}

pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<PlatformSettings> {
    Json(state.admin_service.get_settings().await)
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<PlatformSettings>, AppError> {
    Ok(Json(state.admin_service.update_settings(update).await?))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<PlatformStats> {
    Json(state.admin_service.stats().await)
}

pub async fn update_driver_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<DriverStatusUpdate>,
) -> Result<Json<Driver>, AppError> {
    tracing::info!("PUT /admin/drivers/{}/status - {:?}", id, update.status);
    Ok(Json(state.driver_service.update_driver_status(&id, update.status).await?))
}

pub async fn list_withdrawals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WithdrawalQuery>,
) -> Json<Vec<WithdrawalRequest>> {
    Json(state.wallet_service.list_withdrawals(query.status).await)
}

pub async fn process_withdrawal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WithdrawalRequest>, AppError> {
    Ok(Json(state.wallet_service.process_withdrawal(&id).await?))
}

pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertQuery>,
) -> Json<Vec<FraudAlert>> {
    Json(state.fraud_service.list_alerts(query.include_resolved).await)
}

pub async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FraudAlert>, AppError> {
    Ok(Json(state.fraud_service.resolve_alert(&id).await?))
}

pub async fn scan_fraud(State(state): State<Arc<AppState>>) -> Result<Json<Vec<FraudAlert>>, AppError> {
    Ok(Json(state.fraud_service.scan_all().await?))
}

pub async fn assess_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AssessmentRequest>,
) -> Result<Json<AssessmentResponse>, AppError> {
    let (assessment, alert) = state
        .fraud_service
        .assess_user(&request.user_id, &request.signals)
        .await?;
    Ok(Json(AssessmentResponse { assessment, alert }))
}

pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobInfo>> {
    Json(state.scheduler.list_jobs().await)
}

pub async fn update_job(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(update): Json<JobUpdate>,
) -> Result<Json<JobInfo>, AppError> {
    let mut info = None;
    if let Some(secs) = update.interval_secs {
        info = Some(state.scheduler.set_interval(&name, Duration::from_secs(secs)).await?);
        // Running loops pick up the new interval on restart
        if state.scheduler.is_running().await {
            state.scheduler.start().await;
        }
    }
    if let Some(enabled) = update.enabled {
        info = Some(state.scheduler.set_enabled(&name, enabled).await?);
    }
    info.map(Json)
        .ok_or_else(|| AppError::bad_request("Nothing to update: send enabled and/or interval_secs"))
}

pub async fn run_job(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Result<Json<JobInfo>, AppError> {
    tracing::info!("POST /admin/jobs/{}/run", name);
    Ok(Json(state.scheduler.run_job(&name).await?))
}
