// src/models/notification.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    RideStatus,        // "Your driver is on the way"
    DriverAssigned,    // "New ride request accepted"
    RideCompleted,     // "Trip complete, wallet charged"
    Earnings,          // "You earned 560 NGN"
    Withdrawal,        // "Your withdrawal has been paid"
    Delivery,          // "Package picked up"
    Security,          // Fraud alerts for admins
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
