// src/models/pricing.rs
use serde::{Deserialize, Serialize};

pub const CURRENCY: &str = "NGN";
pub const DEFAULT_COMMISSION_RATE: f64 = 20.0;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleType {
    Keke,  // Tricycle taxi
    Okada, // Motorcycle taxi
    Car,
}

impl VehicleType {
    pub const ALL: [VehicleType; 3] = [VehicleType::Keke, VehicleType::Okada, VehicleType::Car];
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct VehicleRate {
    pub base_fare: f64,
    pub per_km: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PricingTable {
    pub keke: VehicleRate,
    pub okada: VehicleRate,
    pub car: VehicleRate,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            keke: VehicleRate { base_fare: 200.0, per_km: 100.0 },
            okada: VehicleRate { base_fare: 150.0, per_km: 80.0 },
            car: VehicleRate { base_fare: 500.0, per_km: 150.0 },
        }
    }
}

impl PricingTable {
    pub fn rate_for(&self, vehicle_type: VehicleType) -> VehicleRate {
        match vehicle_type {
            VehicleType::Keke => self.keke,
            VehicleType::Okada => self.okada,
            VehicleType::Car => self.car,
        }
    }
}

/// Platform-wide knobs the admin portal can change at runtime.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlatformSettings {
    pub pricing: PricingTable,
    pub surge_multiplier: f64,
    pub commission_rate: f64, // Percent of fare kept by the platform
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            pricing: PricingTable::default(),
            surge_multiplier: 1.0,
            commission_rate: DEFAULT_COMMISSION_RATE,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub pricing: Option<PricingTable>,
    pub surge_multiplier: Option<f64>,
    pub commission_rate: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FareQuote {
    pub vehicle_type: VehicleType,
    pub base_fare: f64,
    pub per_km: f64,
    pub distance_fare: f64,
    pub surge_multiplier: f64,
    pub distance_km: f64,
    pub duration_min: i32,
    pub total: f64,
    pub currency: String,
}

impl FareQuote {
    pub fn rate(&self) -> VehicleRate {
        VehicleRate {
            base_fare: self.base_fare,
            per_km: self.per_km,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct FareSplit {
    pub fare: f64,
    pub driver_share: f64,
    pub commission: f64,
    pub commission_rate: f64,
}

impl FareSplit {
    /// Commission is `fare * rate / 100`; the driver keeps the remainder.
    pub fn compute(fare: f64, commission_rate: f64) -> Self {
        let commission = fare * commission_rate / 100.0;
        Self {
            fare,
            driver_share: fare - commission,
            commission,
            commission_rate,
        }
    }
}
