// src/services/store_service.rs
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    models::{
        driver::Driver,
        fraud::FraudAlert,
        notification::Notification,
        order::DeliveryOrder,
        pricing::PlatformSettings,
        ride::Ride,
        user::{Session, User},
        wallet::{Transaction, TransactionKind, WithdrawalRequest},
    },
    utils::id_generator::{IdGenerator, IdType},
};

/// Everything the application knows, held in process memory.
#[derive(Debug, Default)]
pub struct StoreState {
    pub users: HashMap<String, User>,
    pub drivers: HashMap<String, Driver>,
    pub rides: HashMap<String, Ride>,
    pub orders: HashMap<String, DeliveryOrder>,
    pub withdrawals: HashMap<String, WithdrawalRequest>,
    pub alerts: HashMap<String, FraudAlert>,
    pub sessions: HashMap<String, Session>,
    pub notifications: Vec<Notification>,
    pub transactions: Vec<Transaction>,
    pub settings: PlatformSettings,
    pub platform_revenue: f64,
}

impl StoreState {
    /// Passenger, logistics and admin accounts live in `users`, drivers in `drivers`.
    pub fn account(&self, user_id: &str) -> Option<&User> {
        self.users
            .get(user_id)
            .or_else(|| self.drivers.get(user_id).map(|driver| &driver.user))
    }

    pub fn account_mut(&mut self, user_id: &str) -> Option<&mut User> {
        match self.users.get_mut(user_id) {
            Some(user) => Some(user),
            None => self.drivers.get_mut(user_id).map(|driver| &mut driver.user),
        }
    }

    pub fn account_by_email(&self, email: &str) -> Option<&User> {
        let email = email.trim();
        self.users
            .values()
            .chain(self.drivers.values().map(|driver| &driver.user))
            .find(|user| user.email.eq_ignore_ascii_case(email))
    }

    pub fn account_ids(&self) -> Vec<String> {
        self.users.keys().chain(self.drivers.keys()).cloned().collect()
    }

    /// Moves `amount` (signed) into a wallet and writes the matching ledger entry.
    /// Returns the new balance, or `None` when the account does not exist.
    pub fn apply_to_wallet(
        &mut self,
        user_id: &str,
        kind: TransactionKind,
        amount: f64,
        reference: Option<&str>,
    ) -> Option<f64> {
        let account = self.account_mut(user_id)?;
        account.wallet_balance += amount;
        account.updated_at = Utc::now();
        let balance = account.wallet_balance;

        self.record_transaction(Some(user_id), kind, amount, reference);
        Some(balance)
    }

    pub fn record_transaction(
        &mut self,
        user_id: Option<&str>,
        kind: TransactionKind,
        amount: f64,
        reference: Option<&str>,
    ) {
        self.transactions.push(Transaction {
            id: IdGenerator::generate(IdType::Transaction),
            user_id: user_id.map(str::to_string),
            kind,
            amount,
            reference: reference.map(str::to_string),
            created_at: Utc::now(),
        });
    }

    pub fn transactions_for(&self, user_id: &str) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|txn| txn.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect()
    }
}

pub struct StoreService {
    state: RwLock<StoreState>,
}

impl StoreService {
    pub fn new(settings: PlatformSettings) -> Self {
        Self {
            state: RwLock::new(StoreState {
                settings,
                ..Default::default()
            }),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().await
    }

    pub async fn settings(&self) -> PlatformSettings {
        self.state.read().await.settings.clone()
    }

    pub async fn get_user(&self, user_id: &str) -> Option<User> {
        self.state.read().await.account(user_id).cloned()
    }

    pub async fn get_driver(&self, driver_id: &str) -> Option<Driver> {
        self.state.read().await.drivers.get(driver_id).cloned()
    }

    pub async fn get_ride(&self, ride_id: &str) -> Option<Ride> {
        self.state.read().await.rides.get(ride_id).cloned()
    }

    pub async fn get_order(&self, order_id: &str) -> Option<DeliveryOrder> {
        self.state.read().await.orders.get(order_id).cloned()
    }

    pub async fn insert_user(&self, user: User) {
        tracing::debug!("Storing user: {}", user.id);
        self.state.write().await.users.insert(user.id.clone(), user);
    }

    pub async fn insert_driver(&self, driver: Driver) {
        tracing::debug!("Storing driver: {}", driver.id());
        self.state.write().await.drivers.insert(driver.id().to_string(), driver);
    }

    pub async fn insert_ride(&self, ride: Ride) {
        tracing::debug!("Storing ride: {}", ride.id);
        self.state.write().await.rides.insert(ride.id.clone(), ride);
    }

    pub async fn insert_order(&self, order: DeliveryOrder) {
        tracing::debug!("Storing order: {}", order.id);
        self.state.write().await.orders.insert(order.id.clone(), order);
    }

    pub async fn notifications_for(&self, user_id: &str) -> Vec<Notification> {
        let state = self.state.read().await;
        let mut notifications: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|notification| notification.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications
    }
}

impl Default for StoreService {
    fn default() -> Self {
        Self::new(PlatformSettings::default())
    }
}
