// src/services/wallet_service.rs
use chrono::Utc;
use std::sync::Arc;
use tracing;

use crate::{
    errors::KekeError as AppError,
    models::{
        pricing::FareSplit,
        user::User,
        wallet::{TransactionKind, WalletSummary, WithdrawalRequest, WithdrawalStatus},
    },
    services::{
        messaging_service::NotificationService,
        store_service::{StoreService, StoreState},
    },
    utils::id_generator::{IdGenerator, IdType},
};

/// Splits the fare of a completed ride and moves the money.
///
/// The passenger pays the full fare, the driver gets `driver_share` on both
/// wallet and earnings, and the platform keeps the commission. Without a
/// known driver the share is held as an unclaimed ledger entry. A ride that
/// already carries a settlement is left untouched.
pub fn settle_ride(state: &mut StoreState, ride_id: &str) -> Result<Option<FareSplit>, AppError> {
    let commission_rate = state.settings.commission_rate;
    let ride = state
        .rides
        .get(ride_id)
        .ok_or_else(|| AppError::ride_not_found(ride_id))?;

    if ride.settlement.is_some() {
        tracing::warn!("Ride {} already settled, skipping", ride_id);
        return Ok(None);
    }

    let split = FareSplit::compute(ride.fare, commission_rate);
    let passenger_id = ride.passenger_id.clone();
    let driver_id = ride.driver_id.clone();

    if state
        .apply_to_wallet(&passenger_id, TransactionKind::RideFare, -split.fare, Some(ride_id))
        .is_none()
    {
        tracing::warn!("Passenger {} of ride {} not found, fare not debited", passenger_id, ride_id);
    }

    match driver_id.as_deref().and_then(|id| state.drivers.get_mut(id)) {
        Some(driver) => {
            driver.today_earnings += split.driver_share;
            driver.total_earnings += split.driver_share;
            driver.completed_rides += 1;
            let id = driver.id().to_string();
            state.apply_to_wallet(&id, TransactionKind::RideEarning, split.driver_share, Some(ride_id));
        }
        None => {
            tracing::warn!("Ride {} completed without a known driver, holding the driver share", ride_id);
            state.record_transaction(None, TransactionKind::UnclaimedEarning, split.driver_share, Some(ride_id));
        }
    }

    state.platform_revenue += split.commission;
    state.record_transaction(None, TransactionKind::Commission, split.commission, Some(ride_id));

    if let Some(ride) = state.rides.get_mut(ride_id) {
        ride.settlement = Some(split);
    }

    tracing::info!(
        "Settled ride {}: fare {:.2}, driver {:.2}, commission {:.2}",
        ride_id,
        split.fare,
        split.driver_share,
        split.commission
    );
    Ok(Some(split))
}

pub struct WalletService {
    store: Arc<StoreService>,
    notification_service: Arc<dyn NotificationService>,
}

impl WalletService {
    pub fn new(store: Arc<StoreService>, notification_service: Arc<dyn NotificationService>) -> Self {
        Self {
            store,
            notification_service,
        }
    }

    pub async fn top_up(&self, user_id: &str, amount: f64) -> Result<User, AppError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AppError::validation_error("amount", "Top-up amount must be greater than zero"));
        }

        let mut state = self.store.write().await;
        state
            .apply_to_wallet(user_id, TransactionKind::TopUp, amount, None)
            .ok_or_else(|| AppError::user_not_found(user_id))?;

        tracing::info!("Wallet top-up of {:.2} for {}", amount, user_id);
        state
            .account(user_id)
            .cloned()
            .ok_or_else(|| AppError::user_not_found(user_id))
    }

    pub async fn wallet_summary(&self, user_id: &str) -> Result<WalletSummary, AppError> {
        let state = self.store.read().await;
        let account = state.account(user_id).ok_or_else(|| AppError::user_not_found(user_id))?;

        Ok(WalletSummary {
            user_id: account.id.clone(),
            balance: account.wallet_balance,
            transactions: state.transactions_for(user_id),
        })
    }

    /// Files a withdrawal for everything earned today.
    ///
    /// Today's earnings drop to zero as soon as the request is filed, not when
    /// an admin pays it out; the wallet is debited at the same moment.
    pub async fn request_withdrawal(&self, driver_id: &str) -> Result<WithdrawalRequest, AppError> {
        let mut state = self.store.write().await;
        let driver = state
            .drivers
            .get_mut(driver_id)
            .ok_or_else(|| AppError::driver_not_found(driver_id))?;

        let amount = driver.today_earnings;
        if amount <= 0.0 {
            return Err(AppError::NoEarningsToWithdraw(driver_id.to_string()));
        }
        driver.today_earnings = 0.0;

        let withdrawal = WithdrawalRequest {
            id: IdGenerator::generate(IdType::Withdrawal),
            driver_id: driver_id.to_string(),
            amount,
            status: WithdrawalStatus::Pending,
            requested_at: Utc::now(),
            processed_at: None,
        };

        state.apply_to_wallet(driver_id, TransactionKind::Withdrawal, -amount, Some(&withdrawal.id));
        state.withdrawals.insert(withdrawal.id.clone(), withdrawal.clone());

        tracing::info!("Withdrawal {} of {:.2} requested by {}", withdrawal.id, amount, driver_id);
        Ok(withdrawal)
    }

    /// Admin payout: the only way a request reaches `Completed`.
    pub async fn process_withdrawal(&self, withdrawal_id: &str) -> Result<WithdrawalRequest, AppError> {
        let withdrawal = {
            let mut state = self.store.write().await;
            let withdrawal = state
                .withdrawals
                .get_mut(withdrawal_id)
                .ok_or_else(|| AppError::WithdrawalNotFound(withdrawal_id.to_string()))?;

            if withdrawal.status == WithdrawalStatus::Completed {
                return Err(AppError::WithdrawalAlreadyProcessed(withdrawal_id.to_string()));
            }

            withdrawal.status = WithdrawalStatus::Completed;
            withdrawal.processed_at = Some(Utc::now());
            withdrawal.clone()
        };

        tracing::info!("Withdrawal {} processed for {}", withdrawal.id, withdrawal.driver_id);

        if let Err(e) = self.notification_service.notify_withdrawal_processed(&withdrawal).await {
            tracing::warn!("Failed to notify withdrawal {}: {}", withdrawal.id, e);
        }

        Ok(withdrawal)
    }

    pub async fn list_withdrawals(&self, status: Option<WithdrawalStatus>) -> Vec<WithdrawalRequest> {
        let state = self.store.read().await;
        let mut withdrawals: Vec<WithdrawalRequest> = state
            .withdrawals
            .values()
            .filter(|w| status.is_none_or(|s| w.status == s))
            .cloned()
            .collect();
        withdrawals.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        withdrawals
    }

    /// Zeroes every driver's daily earnings; returns how many were non-zero.
    pub async fn reset_daily_earnings(&self) -> usize {
        let mut state = self.store.write().await;
        let mut reset = 0;
        for driver in state.drivers.values_mut() {
            if driver.today_earnings != 0.0 {
                driver.today_earnings = 0.0;
                reset += 1;
            }
        }
        tracing::info!("Daily earnings reset for {} drivers", reset);
        reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        driver::{Driver, DriverStatus},
        pricing::{VehicleRate, VehicleType},
        ride::{Place, Ride, RideStatus},
        user::Role,
    };
    use crate::services::messaging_service::MockNotificationService;

    const PASSENGER: &str = "usr-261016-aaaaa";
    const DRIVER: &str = "drv-261016-bbbbb";

    async fn seeded_store() -> Arc<StoreService> {
        let store = Arc::new(StoreService::default());

        let mut passenger = User::new("Ada".into(), "ada@keke.ng".into(), "0801".into(), Role::Passenger);
        passenger.id = PASSENGER.into();
        passenger.wallet_balance = 5000.0;
        store.insert_user(passenger).await;

        let mut user = User::new("Musa".into(), "musa@keke.ng".into(), "0803".into(), Role::Driver);
        user.id = DRIVER.into();
        user.wallet_balance = 100.0;
        store
            .insert_driver(Driver {
                user,
                vehicle_type: VehicleType::Keke,
                plate: "LAG-123-KJ".into(),
                rating: 4.8,
                status: DriverStatus::Active,
                total_earnings: 0.0,
                today_earnings: 0.0,
                completed_rides: 0,
            })
            .await;
        store
    }

    fn completed_ride(id: &str, fare: f64) -> Ride {
        let now = Utc::now();
        Ride {
            id: id.into(),
            passenger_id: PASSENGER.into(),
            driver_id: Some(DRIVER.into()),
            vehicle_type: VehicleType::Keke,
            status: RideStatus::Completed,
            pickup: Place { address: "A".into(), coordinates: None },
            dropoff: Place { address: "B".into(), coordinates: None },
            distance_km: 5.0,
            duration_min: 10,
            fare,
            quoted_rate: VehicleRate { base_fare: 200.0, per_km: 100.0 },
            surge_multiplier: 1.0,
            settlement: None,
            progress: 100,
            current_position: None,
            created_at: now,
            accepted_at: None,
            arrived_at: None,
            started_at: None,
            completed_at: Some(now),
            cancelled_at: None,
            cancel_reason: None,
            updated_at: now,
        }
    }

    fn service(store: Arc<StoreService>) -> WalletService {
        WalletService::new(store, Arc::new(MockNotificationService))
    }

    #[tokio::test]
    async fn test_settlement_moves_money_once() {
        let store = seeded_store().await;
        store.insert_ride(completed_ride("rid-261016-ccccc", 700.0)).await;

        let mut state = store.write().await;
        let split = settle_ride(&mut state, "rid-261016-ccccc").unwrap().unwrap();
        assert_eq!(split.commission, 140.0);
        assert_eq!(split.driver_share, 560.0);

        assert_eq!(settle_ride(&mut state, "rid-261016-ccccc").unwrap(), None);
        assert_eq!(state.account(PASSENGER).unwrap().wallet_balance, 4300.0);
        assert_eq!(state.account(DRIVER).unwrap().wallet_balance, 660.0);
        assert_eq!(state.drivers[DRIVER].today_earnings, 560.0);
        assert_eq!(state.drivers[DRIVER].completed_rides, 1);
        assert_eq!(state.platform_revenue, 140.0);
    }

    #[tokio::test]
    async fn test_balances_after_many_rides() {
        let store = seeded_store().await;
        let fares = [700.0, 1050.0, 420.0];
        let mut state = store.write().await;
        let mut shares = 0.0;
        for (i, fare) in fares.iter().enumerate() {
            let id = format!("rid-261016-r{:04}", i);
            state.rides.insert(id.clone(), completed_ride(&id, *fare));
            shares += settle_ride(&mut state, &id).unwrap().unwrap().driver_share;
        }

        let passenger_balance = state.account(PASSENGER).unwrap().wallet_balance;
        let driver_balance = state.account(DRIVER).unwrap().wallet_balance;
        assert!((passenger_balance - (5000.0 - fares.iter().sum::<f64>())).abs() < 1e-9);
        assert!((driver_balance - (100.0 + shares)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_withdrawal_resets_earnings_on_request() {
        let store = seeded_store().await;
        store.write().await.drivers.get_mut(DRIVER).unwrap().today_earnings = 560.0;
        let wallet = service(store.clone());

        let withdrawal = wallet.request_withdrawal(DRIVER).await.unwrap();
        assert_eq!(withdrawal.amount, 560.0);
        assert_eq!(withdrawal.status, WithdrawalStatus::Pending);
        // Reset happens at submission, before any admin action
        assert_eq!(store.get_driver(DRIVER).await.unwrap().today_earnings, 0.0);

        let processed = wallet.process_withdrawal(&withdrawal.id).await.unwrap();
        assert_eq!(processed.status, WithdrawalStatus::Completed);
        assert!(processed.processed_at.is_some());
        assert!(matches!(
            wallet.process_withdrawal(&withdrawal.id).await,
            Err(AppError::WithdrawalAlreadyProcessed(_))
        ));
    }

    #[tokio::test]
    async fn test_withdrawal_requires_earnings() {
        let wallet = service(seeded_store().await);
        assert!(matches!(
            wallet.request_withdrawal(DRIVER).await,
            Err(AppError::NoEarningsToWithdraw(_))
        ));
        assert!(matches!(
            wallet.request_withdrawal("drv-261016-zzzzz").await,
            Err(AppError::DriverNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_top_up_validation() {
        let wallet = service(seeded_store().await);
        assert!(wallet.top_up(PASSENGER, 0.0).await.is_err());
        let user = wallet.top_up(PASSENGER, 1500.0).await.unwrap();
        assert_eq!(user.wallet_balance, 6500.0);
        assert_eq!(wallet.wallet_summary(PASSENGER).await.unwrap().transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_daily_earnings() {
        let store = seeded_store().await;
        store.write().await.drivers.get_mut(DRIVER).unwrap().today_earnings = 300.0;
        let wallet = service(store.clone());
        assert_eq!(wallet.reset_daily_earnings().await, 1);
        assert_eq!(store.get_driver(DRIVER).await.unwrap().today_earnings, 0.0);
    }

    #[tokio::test]
    async fn test_driverless_settlement_keeps_ledger_balanced() {
        let store = seeded_store().await;
        let mut ride = completed_ride("rid-261016-nodrv", 700.0);
        ride.driver_id = None;
        store.insert_ride(ride).await;

        let mut state = store.write().await;
        let split = settle_ride(&mut state, "rid-261016-nodrv").unwrap().unwrap();
        let net: f64 = state
            .transactions
            .iter()
            .filter(|t| t.reference.as_deref() == Some("rid-261016-nodrv"))
            .map(|t| t.amount)
            .sum();
        assert!(net.abs() < 1e-9);
        assert!(state
            .transactions
            .iter()
            .any(|t| t.kind == TransactionKind::UnclaimedEarning && t.amount == split.driver_share));
    }
}
