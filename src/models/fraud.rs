// src/models/fraud.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum AlertType {
    RapidBooking,
    ExcessiveCancellation,
    NewAccount,
    GpsSpoofing,
    MultipleAccounts,
    PaymentFraud,
    FareManipulation,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecommendedAction {
    NoAction,
    Monitor,
    ManualReview,
    SuspendAccount,
}

/// Raw behaviour counters a score is computed from.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct FraudSignals {
    pub rides_last_hour: u32,
    pub cancellations_today: u32,
    pub account_age_hours: f64,
    pub max_speed_kmh: f64,
    pub shared_device_accounts: u32,
    pub failed_payments: u32,
    pub fare_anomaly: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RiskAssessment {
    pub risk_score: u8,
    pub triggered: Vec<(AlertType, u8)>,
    pub evidence: Vec<String>,
    pub recommended_action: RecommendedAction,
}

impl RiskAssessment {
    /// Heaviest triggered condition, if any.
    pub fn primary_type(&self) -> Option<AlertType> {
        self.triggered
            .iter()
            .max_by_key(|(_, weight)| *weight)
            .map(|(alert_type, _)| *alert_type)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FraudAlert {
    pub id: String,
    pub user_id: String,
    pub alert_type: AlertType,
    pub risk_score: u8,
    pub evidence: Vec<String>,
    pub recommended_action: RecommendedAction,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub user_id: String,
    pub signals: FraudSignals,
}
