// src/services/driver_service.rs
use async_trait::async_trait;
use std::sync::Arc;
use tracing;

use crate::{
    errors::KekeError as AppError,
    models::{
        driver::{Driver, DriverRegistration, DriverStatus},
        notification::NotificationKind,
        pricing::VehicleType,
        user::{Role, User},
        wallet::WithdrawalRequest,
    },
    services::{
        messaging_service::{NotificationMessage, NotificationService},
        store_service::StoreService,
    },
    utils::id_generator::{IdGenerator, IdType},
};

#[async_trait]
pub trait DriverOperations: Send + Sync {
    async fn register_driver(&self, registration: DriverRegistration) -> Result<Driver, AppError>;
    async fn get_driver(&self, driver_id: &str) -> Result<Option<Driver>, AppError>;
    async fn list_drivers(&self, status: Option<DriverStatus>) -> Result<Vec<Driver>, AppError>;
    async fn update_driver_status(&self, driver_id: &str, status: DriverStatus) -> Result<Driver, AppError>;
    async fn get_available_drivers(&self, vehicle_type: VehicleType) -> Result<Vec<Driver>, AppError>;
    async fn get_driver_withdrawals(&self, driver_id: &str) -> Result<Vec<WithdrawalRequest>, AppError>;
}

pub struct DriverService {
    store: Arc<StoreService>,
    notification_service: Arc<dyn NotificationService>,
}

impl DriverService {
    pub fn new(store: Arc<StoreService>, notification_service: Arc<dyn NotificationService>) -> Self {
        Self {
            store,
            notification_service,
        }
    }
}

#[async_trait]
impl DriverOperations for DriverService {
    /// New drivers wait in `Pending` until an admin approves them.
    async fn register_driver(&self, registration: DriverRegistration) -> Result<Driver, AppError> {
        tracing::info!("Registering {:?} driver: {}", registration.vehicle_type, registration.email);

        if registration.name.trim().is_empty() {
            return Err(AppError::MissingRequiredField("name".to_string()));
        }
        if registration.plate.trim().is_empty() {
            return Err(AppError::MissingRequiredField("plate".to_string()));
        }

        let driver = {
            let mut state = self.store.write().await;
            if state.account_by_email(&registration.email).is_some() {
                return Err(AppError::Conflict(format!(
                    "An account already exists for {}",
                    registration.email
                )));
            }
            let plate = registration.plate.trim().to_uppercase();
            if state.drivers.values().any(|d| d.plate == plate) {
                return Err(AppError::Conflict(format!("Plate {} is already registered", plate)));
            }

            let mut user = User::new(
                registration.name.trim().to_string(),
                registration.email.trim().to_lowercase(),
                registration.phone,
                Role::Driver,
            );
            user.id = IdGenerator::generate(IdType::Driver);

            let driver = Driver {
                user,
                vehicle_type: registration.vehicle_type,
                plate,
                rating: 5.0,
                status: DriverStatus::Pending,
                total_earnings: 0.0,
                today_earnings: 0.0,
                completed_rides: 0,
            };
            state.drivers.insert(driver.id().to_string(), driver.clone());
            driver
        };

        tracing::info!("Driver registered successfully: {}", driver.id());
        Ok(driver)
    }

    async fn get_driver(&self, driver_id: &str) -> Result<Option<Driver>, AppError> {
        if !IdGenerator::validate_id(driver_id, Some(IdType::Driver)) {
            tracing::warn!("Invalid driver ID format: {}", driver_id);
            return Ok(None);
        }

        tracing::debug!("Getting driver: {}", driver_id);
        Ok(self.store.get_driver(driver_id).await)
    }

    async fn list_drivers(&self, status: Option<DriverStatus>) -> Result<Vec<Driver>, AppError> {
        let state = self.store.read().await;
        let mut drivers: Vec<Driver> = state
            .drivers
            .values()
            .filter(|driver| status.is_none_or(|s| driver.status == s))
            .cloned()
            .collect();
        drivers.sort_by(|a, b| a.user.name.cmp(&b.user.name));
        Ok(drivers)
    }

    async fn update_driver_status(&self, driver_id: &str, status: DriverStatus) -> Result<Driver, AppError> {
        tracing::info!("Updating driver status: {} to {:?}", driver_id, status);

        let (driver, previous) = {
            let mut state = self.store.write().await;
            let driver = state
                .drivers
                .get_mut(driver_id)
                .ok_or_else(|| AppError::driver_not_found(driver_id))?;
            let previous = driver.status;
            driver.status = status;
            driver.user.updated_at = chrono::Utc::now();
            (driver.clone(), previous)
        };

        if previous != status {
            let (title, body) = match status {
                DriverStatus::Active => ("Account approved", "You can now accept rides"),
                DriverStatus::Suspended => ("Account suspended", "Contact support to restore access"),
                DriverStatus::Pending => ("Account under review", "An admin is reviewing your account"),
            };
            let message = NotificationMessage::new(NotificationKind::Security, title, body);
            if let Err(e) = self.notification_service.send_to_user(driver_id, message).await {
                tracing::warn!("Failed to notify driver {}: {}", driver_id, e);
            }
        }

        Ok(driver)
    }

    async fn get_available_drivers(&self, vehicle_type: VehicleType) -> Result<Vec<Driver>, AppError> {
        let state = self.store.read().await;
        Ok(state
            .drivers
            .values()
            .filter(|driver| driver.is_available() && driver.vehicle_type == vehicle_type)
            .cloned()
            .collect())
    }

    async fn get_driver_withdrawals(&self, driver_id: &str) -> Result<Vec<WithdrawalRequest>, AppError> {
        let state = self.store.read().await;
        if !state.drivers.contains_key(driver_id) {
            return Err(AppError::driver_not_found(driver_id));
        }

        let mut withdrawals: Vec<WithdrawalRequest> = state
            .withdrawals
            .values()
            .filter(|w| w.driver_id == driver_id)
            .cloned()
            .collect();
        withdrawals.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(withdrawals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::messaging_service::MockNotificationService;

    fn service() -> DriverService {
        DriverService::new(Arc::new(StoreService::default()), Arc::new(MockNotificationService))
    }

    fn registration(email: &str, plate: &str) -> DriverRegistration {
        DriverRegistration {
            name: "Musa Bello".into(),
            email: email.into(),
            phone: "08030000000".into(),
            vehicle_type: VehicleType::Okada,
            plate: plate.into(),
        }
    }

    #[tokio::test]
    async fn test_registered_driver_awaits_approval() {
        let service = service();
        let driver = service.register_driver(registration("musa@keke.ng", "lag-1")).await.unwrap();

        assert!(driver.id().starts_with("drv-"));
        assert_eq!(driver.status, DriverStatus::Pending);
        assert_eq!(driver.plate, "LAG-1");
        assert!(service.get_available_drivers(VehicleType::Okada).await.unwrap().is_empty());

        let approved = service.update_driver_status(driver.id(), DriverStatus::Active).await.unwrap();
        assert!(approved.is_available());
        assert_eq!(service.get_available_drivers(VehicleType::Okada).await.unwrap().len(), 1);
        assert!(service.get_available_drivers(VehicleType::Car).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_plate_conflicts() {
        let service = service();
        service.register_driver(registration("a@keke.ng", "LAG-1")).await.unwrap();
        let result = service.register_driver(registration("b@keke.ng", "lag-1")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let service = service();
        let first = service.register_driver(registration("a@keke.ng", "LAG-1")).await.unwrap();
        service.register_driver(registration("b@keke.ng", "LAG-2")).await.unwrap();
        service.update_driver_status(first.id(), DriverStatus::Suspended).await.unwrap();

        assert_eq!(service.list_drivers(None).await.unwrap().len(), 2);
        assert_eq!(service.list_drivers(Some(DriverStatus::Pending)).await.unwrap().len(), 1);
        assert_eq!(service.list_drivers(Some(DriverStatus::Suspended)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_driver() {
        let service = service();
        assert!(service.get_driver("not-an-id").await.unwrap().is_none());
        let result = service.update_driver_status("drv-261016-zzzzz", DriverStatus::Active).await;
        assert!(matches!(result, Err(AppError::DriverNotFound(_))));
    }
}
