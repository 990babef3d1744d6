// src/services/fraud_service.rs
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing;

use crate::{
    errors::KekeError as AppError,
    models::{
        fraud::{AlertType, FraudAlert, FraudSignals, RecommendedAction, RiskAssessment},
        notification::NotificationKind,
        ride::RideStatus,
        user::Role,
        wallet::TransactionKind,
    },
    services::{
        messaging_service::{NotificationMessage, NotificationService},
        store_service::{StoreService, StoreState},
    },
    utils::id_generator::{IdGenerator, IdType},
};

pub const ALERT_THRESHOLD: u8 = 25;
const MAX_SCORE: u32 = 100;
// Relative gap between a stored fare and its booking-time quote that counts as tampering
const FARE_TOLERANCE: f64 = 0.01;

/// Scores a set of signals. Each rule adds a fixed weight, so switching a
/// rule on never lowers the score.
pub fn assess(signals: &FraudSignals) -> RiskAssessment {
    let rules: [(bool, AlertType, u8, String); 7] = [
        (
            signals.rides_last_hour > 5,
            AlertType::RapidBooking,
            25,
            format!("{} rides booked in the last hour", signals.rides_last_hour),
        ),
        (
            signals.cancellations_today >= 3,
            AlertType::ExcessiveCancellation,
            20,
            format!("{} cancellations today", signals.cancellations_today),
        ),
        (
            signals.account_age_hours < 24.0,
            AlertType::NewAccount,
            10,
            format!("Account is {:.1} hours old", signals.account_age_hours),
        ),
        (
            signals.max_speed_kmh > 150.0,
            AlertType::GpsSpoofing,
            30,
            format!("Impossible speed of {:.0} km/h", signals.max_speed_kmh),
        ),
        (
            signals.shared_device_accounts > 1,
            AlertType::MultipleAccounts,
            25,
            format!("{} accounts share this device", signals.shared_device_accounts),
        ),
        (
            signals.failed_payments >= 2,
            AlertType::PaymentFraud,
            20,
            format!("{} failed payments", signals.failed_payments),
        ),
        (
            signals.fare_anomaly,
            AlertType::FareManipulation,
            15,
            "Fare does not match the distance travelled".to_string(),
        ),
    ];

    let mut total: u32 = 0;
    let mut triggered = Vec::new();
    let mut evidence = Vec::new();
    for (hit, alert_type, weight, description) in rules {
        if hit {
            total += u32::from(weight);
            triggered.push((alert_type, weight));
            evidence.push(description);
        }
    }

    let risk_score = total.min(MAX_SCORE) as u8;
    RiskAssessment {
        risk_score,
        triggered,
        evidence,
        recommended_action: recommend(risk_score),
    }
}

pub fn recommend(risk_score: u8) -> RecommendedAction {
    match risk_score {
        80.. => RecommendedAction::SuspendAccount,
        50.. => RecommendedAction::ManualReview,
        25.. => RecommendedAction::Monitor,
        _ => RecommendedAction::NoAction,
    }
}

/// Reads what the store knows about one account into scorer input.
///
/// There is no device or GPS telemetry in memory: the phone number stands in
/// for the device, and speed stays at zero unless a caller supplies it.
pub fn derive_signals(state: &StoreState, user_id: &str) -> Option<FraudSignals> {
    let account = state.account(user_id)?;
    let now = Utc::now();
    let hour_ago = now - Duration::hours(1);
    let today = now.date_naive();

    let booked: Vec<_> = state.rides.values().filter(|ride| ride.passenger_id == user_id).collect();
    let rides_last_hour = booked.iter().filter(|ride| ride.created_at >= hour_ago).count() as u32;
    let cancellations_today = booked
        .iter()
        .filter(|ride| ride.status == RideStatus::Cancelled)
        .filter(|ride| ride.cancelled_at.is_some_and(|at| at.date_naive() == today))
        .count() as u32;

    let shared_device_accounts = if account.phone.trim().is_empty() {
        1
    } else {
        state
            .users
            .values()
            .chain(state.drivers.values().map(|driver| &driver.user))
            .filter(|other| other.phone == account.phone)
            .count() as u32
    };

    // Walk the ledger backwards from today's balance to see which fares
    // were charged into a negative wallet.
    let mut balance = account.wallet_balance;
    let mut failed_payments = 0;
    for txn in state.transactions.iter().rev().filter(|t| t.user_id.as_deref() == Some(user_id)) {
        if txn.kind == TransactionKind::RideFare && balance < 0.0 {
            failed_payments += 1;
        }
        balance -= txn.amount;
    }

    let fare_anomaly = state
        .rides
        .values()
        .filter(|ride| ride.passenger_id == user_id || ride.driver_id.as_deref() == Some(user_id))
        .any(|ride| {
            let expected = ride.quoted_fare();
            expected > 0.0 && ((ride.fare - expected) / expected).abs() > FARE_TOLERANCE
        });

    Some(FraudSignals {
        rides_last_hour,
        cancellations_today,
        account_age_hours: (now - account.created_at).num_minutes() as f64 / 60.0,
        max_speed_kmh: 0.0,
        shared_device_accounts,
        failed_payments,
        fare_anomaly,
    })
}

pub struct FraudService {
    store: Arc<StoreService>,
    notification_service: Arc<dyn NotificationService>,
}

impl FraudService {
    pub fn new(store: Arc<StoreService>, notification_service: Arc<dyn NotificationService>) -> Self {
        Self {
            store,
            notification_service,
        }
    }

    /// Scores `signals` for a user and records an alert when the score warrants one.
    pub async fn assess_user(
        &self,
        user_id: &str,
        signals: &FraudSignals,
    ) -> Result<(RiskAssessment, Option<FraudAlert>), AppError> {
        let assessment = assess(signals);
        let alert = {
            let mut state = self.store.write().await;
            if state.account(user_id).is_none() {
                return Err(AppError::user_not_found(user_id));
            }
            record_alert(&mut state, user_id, &assessment)
        };

        if let Some(alert) = &alert {
            self.notify_admins(std::slice::from_ref(alert)).await;
        }
        Ok((assessment, alert))
    }

    /// Scores every account from what the store knows and records the alerts.
    pub async fn scan_all(&self) -> Result<Vec<FraudAlert>, AppError> {
        let raised = {
            let mut state = self.store.write().await;
            let mut raised = Vec::new();
            for user_id in state.account_ids() {
                let Some(signals) = derive_signals(&state, &user_id) else {
                    continue;
                };
                let assessment = assess(&signals);
                if let Some(alert) = record_alert(&mut state, &user_id, &assessment) {
                    raised.push(alert);
                }
            }
            raised
        };

        tracing::info!("Fraud scan raised or refreshed {} alerts", raised.len());
        self.notify_admins(&raised).await;
        Ok(raised)
    }

    pub async fn list_alerts(&self, include_resolved: bool) -> Vec<FraudAlert> {
        let state = self.store.read().await;
        let mut alerts: Vec<FraudAlert> = state
            .alerts
            .values()
            .filter(|alert| include_resolved || !alert.resolved)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.risk_score.cmp(&a.risk_score).then(b.created_at.cmp(&a.created_at)));
        alerts
    }

    pub async fn resolve_alert(&self, alert_id: &str) -> Result<FraudAlert, AppError> {
        let mut state = self.store.write().await;
        let alert = state
            .alerts
            .get_mut(alert_id)
            .ok_or_else(|| AppError::AlertNotFound(alert_id.to_string()))?;
        alert.resolved = true;
        tracing::info!("Fraud alert {} resolved", alert_id);
        Ok(alert.clone())
    }

    async fn notify_admins(&self, alerts: &[FraudAlert]) {
        if alerts.is_empty() {
            return;
        }
        let admins: Vec<String> = {
            let state = self.store.read().await;
            state
                .users
                .values()
                .filter(|user| user.role == Role::Admin)
                .map(|user| user.id.clone())
                .collect()
        };

        for alert in alerts {
            for admin_id in &admins {
                let message = NotificationMessage::new(
                    NotificationKind::Security,
                    "Fraud alert",
                    &format!(
                        "{:?} on {} scored {} ({:?})",
                        alert.alert_type, alert.user_id, alert.risk_score, alert.recommended_action
                    ),
                );
                if let Err(e) = self.notification_service.send_to_user(admin_id, message).await {
                    tracing::warn!("Failed to notify admin {}: {}", admin_id, e);
                }
            }
        }
    }
}

/// Keeps one open alert per user and type: a repeat refreshes the open one.
fn record_alert(state: &mut StoreState, user_id: &str, assessment: &RiskAssessment) -> Option<FraudAlert> {
    if assessment.risk_score < ALERT_THRESHOLD {
        return None;
    }
    let alert_type = assessment.primary_type()?;

    let existing = state
        .alerts
        .values()
        .find(|alert| !alert.resolved && alert.user_id == user_id && alert.alert_type == alert_type)
        .map(|alert| alert.id.clone());

    let alert = match existing.and_then(|id| state.alerts.get_mut(&id)) {
        Some(alert) => {
            alert.risk_score = assessment.risk_score;
            alert.evidence = assessment.evidence.clone();
            alert.recommended_action = assessment.recommended_action;
            alert.clone()
        }
        None => {
            let alert = FraudAlert {
                id: IdGenerator::generate(IdType::Alert),
                user_id: user_id.to_string(),
                alert_type,
                risk_score: assessment.risk_score,
                evidence: assessment.evidence.clone(),
                recommended_action: assessment.recommended_action,
                resolved: false,
                created_at: Utc::now(),
            };
            state.alerts.insert(alert.id.clone(), alert.clone());
            alert
        }
    };

    tracing::warn!(
        "Fraud alert {} for {}: {:?} score {}",
        alert.id,
        user_id,
        alert.alert_type,
        alert.risk_score
    );
    Some(alert)
}
