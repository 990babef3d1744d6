// src/models/driver.rs
use serde::{Deserialize, Serialize};

use super::pricing::VehicleType;
use super::user::User;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    Active,     // Approved and allowed to take rides
    Pending,    // Registered, waiting for admin approval
    Suspended,  // Blocked by an admin or the fraud scorer
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Driver {
    #[serde(flatten)]
    pub user: User,
    pub vehicle_type: VehicleType,
    pub plate: String,
    pub rating: f32,            // Average rating (0-5)
    pub status: DriverStatus,
    pub total_earnings: f64,
    pub today_earnings: f64,    // Zeroed on withdrawal request and at the daily reset
    pub completed_rides: u32,
}

impl Driver {
    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn is_available(&self) -> bool {
        self.status == DriverStatus::Active
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DriverRegistration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub vehicle_type: VehicleType,
    pub plate: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DriverStatusUpdate {
    pub status: DriverStatus,
}
