// src/services/messaging_service.rs
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing;

use crate::{
    errors::KekeError as AppError,
    models::{
        notification::{Notification, NotificationKind},
        order::DeliveryOrder,
        pricing::{FareSplit, CURRENCY},
        ride::{Ride, RideStatus},
        wallet::WithdrawalRequest,
    },
    services::store_service::StoreService,
    utils::id_generator::{IdGenerator, IdType},
};

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send_to_user(&self, user_id: &str, message: NotificationMessage) -> Result<(), AppError>;

    async fn notify_ride_status_update(&self, ride: &Ride) -> Result<(), AppError> {
        let (title, body) = match ride.status {
            RideStatus::Pending => ("Finding your ride", "We are looking for a driver near you".to_string()),
            RideStatus::Accepted => ("Ride accepted", "A driver accepted your request".to_string()),
            RideStatus::Arriving => ("Driver on the way", format!("Your driver is heading to {}", ride.pickup.address)),
            RideStatus::Arrived => ("Driver arrived", "Your driver is waiting at the pickup point".to_string()),
            RideStatus::InProgress => ("Trip started", format!("Heading to {}", ride.dropoff.address)),
            RideStatus::Completed => ("Trip completed", format!("{:.2} {} charged to your wallet", ride.fare, CURRENCY)),
            RideStatus::Cancelled => ("Ride cancelled", ride.cancel_reason.clone().unwrap_or_else(|| "Your ride was cancelled".to_string())),
        };

        let message = NotificationMessage::new(NotificationKind::RideStatus, title, &body).with_data(json!({
            "ride_id": ride.id,
            "status": ride.status,
            "timestamp": Utc::now().to_rfc3339(),
        }));

        self.send_to_user(&ride.passenger_id, message).await
    }

    async fn notify_driver_assigned(&self, ride: &Ride, driver_id: &str) -> Result<(), AppError> {
        let message = NotificationMessage::new(
            NotificationKind::DriverAssigned,
            "New ride",
            &format!("Pickup at {} - {:.2} {}", ride.pickup.address, ride.fare, CURRENCY),
        )
        .with_data(json!({
            "ride_id": ride.id,
            "pickup_address": ride.pickup.address,
            "dropoff_address": ride.dropoff.address,
            "fare": ride.fare,
        }));

        self.send_to_user(driver_id, message).await
    }

    async fn notify_ride_earnings(&self, ride: &Ride, driver_id: &str, split: &FareSplit) -> Result<(), AppError> {
        let message = NotificationMessage::new(
            NotificationKind::Earnings,
            "Trip earnings",
            &format!("You earned {:.2} {} ({}% commission)", split.driver_share, CURRENCY, split.commission_rate),
        )
        .with_data(json!({
            "ride_id": ride.id,
            "driver_share": split.driver_share,
            "commission": split.commission,
        }));

        self.send_to_user(driver_id, message).await
    }

    async fn notify_withdrawal_processed(&self, withdrawal: &WithdrawalRequest) -> Result<(), AppError> {
        let message = NotificationMessage::new(
            NotificationKind::Withdrawal,
            "Withdrawal paid",
            &format!("{:.2} {} has been sent to your account", withdrawal.amount, CURRENCY),
        )
        .with_data(json!({ "withdrawal_id": withdrawal.id, "amount": withdrawal.amount }));

        self.send_to_user(&withdrawal.driver_id, message).await
    }

    async fn notify_delivery_update(&self, order: &DeliveryOrder) -> Result<(), AppError> {
        let message = NotificationMessage::new(
            NotificationKind::Delivery,
            "Delivery update",
            &format!("Order {} is now {:?}", order.tracking_code, order.status),
        )
        .with_data(json!({
            "order_id": order.id,
            "tracking_code": order.tracking_code,
            "status": order.status,
        }));

        self.send_to_user(&order.customer_id, message).await
    }
}

#[derive(Debug, Clone)]
pub struct NotificationMessage {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
}

impl NotificationMessage {
    pub fn new(kind: NotificationKind, title: &str, body: &str) -> Self {
        Self {
            kind,
            title: title.to_string(),
            body: body.to_string(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Keeps notifications in the store so each portal can list its own.
pub struct InAppNotificationService {
    store: Arc<StoreService>,
}

impl InAppNotificationService {
    pub fn new(store: Arc<StoreService>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl NotificationService for InAppNotificationService {
    async fn send_to_user(&self, user_id: &str, message: NotificationMessage) -> Result<(), AppError> {
        if user_id.is_empty() {
            return Err(AppError::validation_error("user_id", "Cannot notify an empty user id"));
        }

        tracing::info!("Notifying {}: {} - {}", user_id, message.title, message.body);

        let notification = Notification {
            id: IdGenerator::generate(IdType::Notification),
            user_id: user_id.to_string(),
            kind: message.kind,
            title: message.title,
            body: message.body,
            data: message.data,
            read: false,
            created_at: Utc::now(),
        };

        self.store.write().await.notifications.push(notification);
        Ok(())
    }
}

// Mock service for development and testing
#[derive(Debug, Default)]
pub struct MockNotificationService;

#[async_trait]
impl NotificationService for MockNotificationService {
    async fn send_to_user(&self, user_id: &str, message: NotificationMessage) -> Result<(), AppError> {
        tracing::info!("[MOCK] Would notify {}: {} - {}", user_id, message.title, message.body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_app_notifications_are_stored() {
        let store = Arc::new(StoreService::default());
        let service = InAppNotificationService::new(store.clone());

        let message = NotificationMessage::new(NotificationKind::Earnings, "Trip earnings", "You earned 560.00 NGN");
        service.send_to_user("drv-261016-a1b2c", message).await.unwrap();

        let notifications = store.notifications_for("drv-261016-a1b2c").await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Earnings);
        assert!(!notifications[0].read);
        assert!(store.notifications_for("usr-261016-a1b2c").await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_user_id_rejected() {
        let service = InAppNotificationService::new(Arc::new(StoreService::default()));
        let message = NotificationMessage::new(NotificationKind::Security, "x", "y");
        assert!(service.send_to_user("", message).await.is_err());
    }
}
