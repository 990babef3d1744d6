// src/services/admin_service.rs
use serde::Serialize;
use std::sync::Arc;
use tracing;

use crate::{
    errors::KekeError as AppError,
    models::{
        driver::DriverStatus,
        order::OrderStatus,
        pricing::{PlatformSettings, SettingsUpdate, VehicleRate, VehicleType},
        ride::RideStatus,
        wallet::WithdrawalStatus,
    },
    services::store_service::StoreService,
    ValidationError,
};

#[derive(Debug, Serialize, PartialEq)]
pub struct PlatformStats {
    pub total_users: usize,
    pub total_drivers: usize,
    pub active_drivers: usize,
    pub pending_drivers: usize,
    pub total_rides: usize,
    pub active_rides: usize,
    pub completed_rides: usize,
    pub cancelled_rides: usize,
    pub total_orders: usize,
    pub delivered_orders: usize,
    pub gross_fares: f64,
    pub platform_revenue: f64,
    pub pending_withdrawals: usize,
    pub pending_withdrawal_amount: f64,
    pub open_fraud_alerts: usize,
}

pub struct AdminService {
    store: Arc<StoreService>,
}

impl AdminService {
    pub fn new(store: Arc<StoreService>) -> Self {
        Self { store }
    }

    pub async fn get_settings(&self) -> PlatformSettings {
        self.store.settings().await
    }

    /// Applies a partial update; nothing changes unless every field is valid.
    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<PlatformSettings, AppError> {
        let mut errors = Vec::new();

        if let Some(surge) = update.surge_multiplier {
            if !surge.is_finite() || surge < 1.0 {
                errors.push(ValidationError {
                    field: "surge_multiplier".to_string(),
                    message: "Surge multiplier must be at least 1.0".to_string(),
                });
            }
        }
        if let Some(rate) = update.commission_rate {
            if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
                errors.push(ValidationError {
                    field: "commission_rate".to_string(),
                    message: "Commission rate must be between 0 and 100".to_string(),
                });
            }
        }
        if let Some(pricing) = &update.pricing {
            for vehicle_type in VehicleType::ALL {
                let VehicleRate { base_fare, per_km } = pricing.rate_for(vehicle_type);
                if !base_fare.is_finite() || !per_km.is_finite() || base_fare < 0.0 || per_km < 0.0 {
                    errors.push(ValidationError {
                        field: format!("pricing.{:?}", vehicle_type).to_lowercase(),
                        message: "Rates cannot be negative".to_string(),
                    });
                }
            }
        }
        if !errors.is_empty() {
            tracing::warn!("Rejected settings update with {} errors", errors.len());
            return Err(AppError::ValidationFailed(errors));
        }

        let mut state = self.store.write().await;
        if let Some(pricing) = update.pricing {
            state.settings.pricing = pricing;
        }
        if let Some(surge) = update.surge_multiplier {
            state.settings.surge_multiplier = surge;
        }
        if let Some(rate) = update.commission_rate {
            state.settings.commission_rate = rate;
        }

        tracing::info!(
            "Platform settings updated: surge {:.2}, commission {:.1}%",
            state.settings.surge_multiplier,
            state.settings.commission_rate
        );
        Ok(state.settings.clone())
    }

    pub async fn stats(&self) -> PlatformStats {
        let state = self.store.read().await;
        let count_rides = |status: RideStatus| state.rides.values().filter(|r| r.status == status).count();
        let pending_withdrawals: Vec<_> = state
            .withdrawals
            .values()
            .filter(|w| w.status == WithdrawalStatus::Pending)
            .collect();

        PlatformStats {
            total_users: state.users.len(),
            total_drivers: state.drivers.len(),
            active_drivers: state.drivers.values().filter(|d| d.status == DriverStatus::Active).count(),
            pending_drivers: state.drivers.values().filter(|d| d.status == DriverStatus::Pending).count(),
            total_rides: state.rides.len(),
            active_rides: state.rides.values().filter(|r| !r.status.is_terminal()).count(),
            completed_rides: count_rides(RideStatus::Completed),
            cancelled_rides: count_rides(RideStatus::Cancelled),
            total_orders: state.orders.len(),
            delivered_orders: state.orders.values().filter(|o| o.status == OrderStatus::Delivered).count(),
            gross_fares: state
                .rides
                .values()
                .filter_map(|r| r.settlement.map(|s| s.fare))
                .sum(),
            platform_revenue: state.platform_revenue,
            pending_withdrawals: pending_withdrawals.len(),
            pending_withdrawal_amount: pending_withdrawals.iter().map(|w| w.amount).sum(),
            open_fraud_alerts: state.alerts.values().filter(|a| !a.resolved).count(),
        }
    }
}
