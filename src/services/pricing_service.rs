// src/services/pricing_service.rs
use std::sync::Arc;
use tracing;

use crate::{
    errors::KekeError as AppError,
    models::{
        order::{OrderPricing, PackageSize},
        pricing::{FareQuote, PlatformSettings, CURRENCY},
        ride::{Coordinates, Place, RideEstimateRequest},
    },
    services::store_service::StoreService,
};

const EARTH_RADIUS_KM: f64 = 6371.0;
// Lagos traffic, averaged across keke/okada/car
const AVERAGE_SPEED_KMH: f64 = 30.0;
const DELIVERY_PER_KM: f64 = 120.0;
const DELIVERY_FREE_WEIGHT_KG: f64 = 5.0;
const DELIVERY_PER_EXTRA_KG: f64 = 50.0;

pub struct PricingService {
    store: Arc<StoreService>,
}

impl PricingService {
    pub fn new(store: Arc<StoreService>) -> Self {
        Self { store }
    }

    pub async fn estimate_ride(&self, request: &RideEstimateRequest) -> Result<FareQuote, AppError> {
        let settings = self.store.settings().await;
        let quote = quote_ride(&settings, request)?;
        tracing::debug!(
            "Quoted {:?} ride {} -> {}: {:.2} {}",
            request.vehicle_type,
            request.pickup.address,
            request.dropoff.address,
            quote.total,
            quote.currency
        );
        Ok(quote)
    }
}

/// Haversine distance between two points.
pub fn calculate_distance_km(from: &Coordinates, to: &Coordinates) -> f64 {
    let lat1_rad = from.latitude.to_radians();
    let lat2_rad = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn calculate_duration_min(distance_km: f64) -> i32 {
    (((distance_km / AVERAGE_SPEED_KMH) * 60.0).round() as i32).max(1)
}

/// Coordinates win over a client-supplied distance when both places have them.
pub fn resolve_distance_km(pickup: &Place, dropoff: &Place, supplied_km: Option<f64>) -> Result<f64, AppError> {
    let distance = match (pickup.coordinates, dropoff.coordinates, supplied_km) {
        (Some(from), Some(to), _) => calculate_distance_km(&from, &to),
        (_, _, Some(km)) => km,
        _ => {
            return Err(AppError::validation_error(
                "distance_km",
                "Provide coordinates for both places or an explicit distance",
            ))
        }
    };

    if !distance.is_finite() || distance < 0.0 {
        return Err(AppError::InvalidFieldValue {
            field: "distance_km".to_string(),
            value: distance.to_string(),
            reason: "distance must be a non-negative number".to_string(),
        });
    }
    Ok(distance)
}

/// `(base + per_km * distance) * surge`
pub fn quote_ride(settings: &PlatformSettings, request: &RideEstimateRequest) -> Result<FareQuote, AppError> {
    let distance_km = resolve_distance_km(&request.pickup, &request.dropoff, request.distance_km)?;
    let rate = settings.pricing.rate_for(request.vehicle_type);
    let distance_fare = rate.per_km * distance_km;
    let total = (rate.base_fare + distance_fare) * settings.surge_multiplier;

    Ok(FareQuote {
        vehicle_type: request.vehicle_type,
        base_fare: rate.base_fare,
        per_km: rate.per_km,
        distance_fare,
        surge_multiplier: settings.surge_multiplier,
        distance_km,
        duration_min: calculate_duration_min(distance_km),
        total,
        currency: CURRENCY.to_string(),
    })
}

pub fn quote_delivery(
    settings: &PlatformSettings,
    package_size: PackageSize,
    weight_kg: f64,
    distance_km: f64,
) -> Result<OrderPricing, AppError> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(AppError::validation_error("weight_kg", "Weight must be greater than zero"));
    }

    let base_price = package_size.base_price();
    let distance_price = distance_km * DELIVERY_PER_KM;
    let weight_surcharge = (weight_kg - DELIVERY_FREE_WEIGHT_KG).max(0.0) * DELIVERY_PER_EXTRA_KG;
    let total = (base_price + distance_price + weight_surcharge) * settings.surge_multiplier;

    Ok(OrderPricing {
        base_price,
        distance_price,
        weight_surcharge,
        surge_multiplier: settings.surge_multiplier,
        total,
        currency: CURRENCY.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pricing::VehicleType;

    fn request(distance_km: Option<f64>) -> RideEstimateRequest {
        RideEstimateRequest {
            pickup: Place { address: "A".into(), coordinates: None },
            dropoff: Place { address: "B".into(), coordinates: None },
            vehicle_type: VehicleType::Keke,
            distance_km,
        }
    }

    #[test]
    fn test_keke_fare_without_surge() {
        let quote = quote_ride(&PlatformSettings::default(), &request(Some(5.0))).unwrap();
        assert_eq!(quote.total, 700.0);
        assert_eq!(quote.currency, "NGN");
    }

    #[test]
    fn test_keke_fare_with_surge() {
        let settings = PlatformSettings { surge_multiplier: 1.5, ..Default::default() };
        let quote = quote_ride(&settings, &request(Some(5.0))).unwrap();
        assert_eq!(quote.total, 1050.0);
    }

    #[test]
    fn test_missing_distance_rejected() {
        let result = quote_ride(&PlatformSettings::default(), &request(None));
        assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    }

    #[test]
    fn test_negative_distance_rejected() {
        let result = quote_ride(&PlatformSettings::default(), &request(Some(-1.0)));
        assert!(matches!(result, Err(AppError::InvalidFieldValue { .. })));
    }

    #[test]
    fn test_coordinates_take_precedence() {
        let mut req = request(Some(100.0));
        req.pickup.coordinates = Some(Coordinates { latitude: 6.5244, longitude: 3.3792 });
        req.dropoff.coordinates = Some(Coordinates { latitude: 6.6018, longitude: 3.3515 });
        let quote = quote_ride(&PlatformSettings::default(), &req).unwrap();
        assert!(quote.distance_km > 8.0 && quote.distance_km < 10.0, "got {}", quote.distance_km);
    }

    #[test]
    fn test_duration_estimate() {
        assert_eq!(calculate_duration_min(15.0), 30);
        assert_eq!(calculate_duration_min(0.0), 1);
    }

    #[test]
    fn test_delivery_quote() {
        let pricing = quote_delivery(&PlatformSettings::default(), PackageSize::Medium, 7.0, 2.0).unwrap();
        assert_eq!(pricing.total, 800.0 + 240.0 + 100.0);
        assert!(quote_delivery(&PlatformSettings::default(), PackageSize::Small, 0.0, 2.0).is_err());
    }
}
