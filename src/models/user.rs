// src/models/user.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use super::ride::Coordinates;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Passenger,
    Driver,
    Logistics,   // Books and tracks package deliveries
    Admin,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub wallet_balance: f64, // May go negative, nothing blocks a debit
    pub location: Option<Coordinates>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, phone: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name,
            email,
            phone,
            role,
            wallet_balance: 0.0,
            location: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// Request/Response Models
#[derive(Debug, Serialize, Deserialize)]
pub struct UserRegistration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    #[serde(default)]
    pub initial_balance: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session: Session,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopUpRequest {
    pub amount: f64,
}
