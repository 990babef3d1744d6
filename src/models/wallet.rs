// src/models/wallet.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalStatus {
    Pending,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WithdrawalRequest {
    pub id: String,
    pub driver_id: String,
    pub amount: f64,
    pub status: WithdrawalStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    TopUp,
    RideFare,       // Passenger debit
    RideEarning,    // Driver credit
    Commission,     // Platform credit
    UnclaimedEarning, // Driver share held by the platform when no driver is known
    Withdrawal,
    DeliveryFee,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Transaction {
    pub id: String,
    pub user_id: Option<String>, // None for platform entries
    pub kind: TransactionKind,
    pub amount: f64,             // Signed: debits are negative
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletSummary {
    pub user_id: String,
    pub balance: f64,
    pub transactions: Vec<Transaction>,
}
