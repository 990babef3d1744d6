// src/models/order.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use super::ride::Place;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,    // Order created, waiting for a rider
    Assigned,   // Rider assigned, heading to sender
    PickedUp,   // Package collected from sender
    InTransit,  // Package is being delivered
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Next step of the happy path, `None` once delivered or cancelled.
    pub fn next(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Assigned),
            OrderStatus::Assigned => Some(OrderStatus::PickedUp),
            OrderStatus::PickedUp => Some(OrderStatus::InTransit),
            OrderStatus::InTransit => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    pub fn is_cancellable(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Assigned)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PackageSize {
    Small,   // Documents, envelopes
    Medium,  // Shoe-box sized parcels
    Large,   // Anything that needs both hands
}

impl PackageSize {
    pub fn base_price(&self) -> f64 {
        match self {
            PackageSize::Small => 500.0,
            PackageSize::Medium => 800.0,
            PackageSize::Large => 1500.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderPricing {
    pub base_price: f64,
    pub distance_price: f64,
    pub weight_surcharge: f64,
    pub surge_multiplier: f64,
    pub total: f64,
    pub currency: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeliveryOrder {
    pub id: String,
    pub customer_id: String,
    pub driver_id: Option<String>,
    pub status: OrderStatus,

    pub pickup: Place,
    pub dropoff: Place,
    pub distance_km: f64,

    pub package_size: PackageSize,
    pub weight_kg: f64,
    pub description: Option<String>,

    pub pricing: OrderPricing,
    pub tracking_code: String, // Shared with the recipient

    pub created_at: DateTime<Utc>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderRequest {
    pub customer_id: String,
    pub pickup: Place,
    pub dropoff: Place,
    pub distance_km: Option<f64>,
    pub package_size: PackageSize,
    pub weight_kg: f64,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct OrderAdvance {
    pub driver_id: Option<String>, // Required when moving to Assigned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_order() {
        let mut status = OrderStatus::Pending;
        let mut seen = vec![status];
        while let Some(next) = status.next() {
            status = next;
            seen.push(status);
        }
        assert_eq!(
            seen,
            vec![
                OrderStatus::Pending,
                OrderStatus::Assigned,
                OrderStatus::PickedUp,
                OrderStatus::InTransit,
                OrderStatus::Delivered
            ]
        );
    }

    #[test]
    fn test_cancellable_before_pickup_only() {
        assert!(OrderStatus::Pending.is_cancellable());
        assert!(OrderStatus::Assigned.is_cancellable());
        assert!(!OrderStatus::PickedUp.is_cancellable());
        assert!(!OrderStatus::Delivered.is_cancellable());
    }
}
