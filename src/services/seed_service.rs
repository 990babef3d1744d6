// src/services/seed_service.rs
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing;

use crate::{
    errors::KekeError as AppError,
    models::{
        driver::{Driver, DriverStatus},
        pricing::{FareSplit, VehicleType},
        ride::{Coordinates, Place, Ride, RideEstimateRequest, RideStatus},
        user::{Role, User},
        wallet::{WithdrawalRequest, WithdrawalStatus},
    },
    services::{pricing_service::quote_ride, store_service::StoreService},
};

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct SeedSummary {
    pub users: usize,
    pub drivers: usize,
    pub rides: usize,
    pub withdrawals: usize,
}

fn place(address: &str, latitude: f64, longitude: f64) -> Place {
    Place {
        address: address.to_string(),
        coordinates: Some(Coordinates { latitude, longitude }),
    }
}

fn account(id: &str, name: &str, email: &str, phone: &str, role: Role, balance: f64, age_days: i64) -> User {
    let mut user = User::new(name.to_string(), email.to_string(), phone.to_string(), role);
    user.id = id.to_string();
    user.wallet_balance = balance;
    user.created_at = Utc::now() - Duration::days(age_days);
    user.updated_at = user.created_at;
    user
}

fn driver(user: User, vehicle_type: VehicleType, plate: &str, rating: f32, status: DriverStatus) -> Driver {
    Driver {
        user,
        vehicle_type,
        plate: plate.to_string(),
        rating,
        status,
        total_earnings: 0.0,
        today_earnings: 0.0,
        completed_rides: 0,
    }
}

/// Loads the demo accounts and trip history. Does nothing when the store
/// already holds accounts.
pub async fn seed_demo_data(store: &StoreService) -> Result<SeedSummary, AppError> {
    let mut state = store.write().await;
    if !state.users.is_empty() || !state.drivers.is_empty() {
        tracing::info!("Store already populated, skipping demo data");
        return Ok(SeedSummary::default());
    }

    let users = [
        account("usr-240101-adm01", "Kemi Adeyemi", "admin@keke.ng", "08010000001", Role::Admin, 0.0, 400),
        account("usr-240101-pas01", "Ada Okafor", "ada@keke.ng", "08020000001", Role::Passenger, 15_000.0, 120),
        account("usr-240101-pas02", "Emeka Nwosu", "emeka@keke.ng", "08020000002", Role::Passenger, 4_500.0, 45),
        account("usr-240101-log01", "Bisi Logistics", "bisi@keke.ng", "08030000001", Role::Logistics, 25_000.0, 90),
    ];
    let drivers = [
        driver(
            account("drv-240101-kek01", "Musa Ibrahim", "musa@keke.ng", "08040000001", Role::Driver, 0.0, 300),
            VehicleType::Keke,
            "LAG-234-KJ",
            4.8,
            DriverStatus::Active,
        ),
        driver(
            account("drv-240101-oka01", "Tunde Bakare", "tunde@keke.ng", "08040000002", Role::Driver, 0.0, 200),
            VehicleType::Okada,
            "LAG-781-OK",
            4.6,
            DriverStatus::Active,
        ),
        driver(
            account("drv-240101-car01", "Ngozi Eze", "ngozi@keke.ng", "08040000003", Role::Driver, 0.0, 150),
            VehicleType::Car,
            "LAG-102-CR",
            4.9,
            DriverStatus::Active,
        ),
        driver(
            account("drv-240101-kek02", "Segun Alade", "segun@keke.ng", "08040000004", Role::Driver, 0.0, 2),
            VehicleType::Keke,
            "LAG-555-KJ",
            5.0,
            DriverStatus::Pending,
        ),
    ];

    let summary_users = users.len();
    let summary_drivers = drivers.len();
    for user in users {
        state.users.insert(user.id.clone(), user);
    }
    for driver in drivers {
        state.drivers.insert(driver.id().to_string(), driver);
    }

    // Finished trips; balances above already reflect them
    let history = [
        (
            "rid-240101-his01",
            "usr-240101-pas01",
            "drv-240101-kek01",
            VehicleType::Keke,
            place("Yaba Bus Stop", 6.5095, 3.3711),
            place("University of Lagos", 6.5158, 3.3898),
            3,
        ),
        (
            "rid-240101-his02",
            "usr-240101-pas01",
            "drv-240101-car01",
            VehicleType::Car,
            place("Ikeja City Mall", 6.6018, 3.3515),
            place("Murtala Muhammed Airport", 6.5774, 3.3212),
            2,
        ),
        (
            "rid-240101-his03",
            "usr-240101-pas02",
            "drv-240101-oka01",
            VehicleType::Okada,
            place("Surulere", 6.5000, 3.3580),
            place("Costain", 6.4930, 3.3680),
            0,
        ),
    ];

    let commission_rate = state.settings.commission_rate;
    let mut rides = 0;
    for (id, passenger_id, driver_id, vehicle_type, pickup, dropoff, days_ago) in history {
        let quote = quote_ride(
            &state.settings,
            &RideEstimateRequest {
                pickup: pickup.clone(),
                dropoff: dropoff.clone(),
                vehicle_type,
                distance_km: None,
            },
        )?;
        let split = FareSplit::compute(quote.total, commission_rate);
        let created_at = Utc::now() - Duration::days(days_ago) - Duration::hours(2);
        let started_at = created_at + Duration::minutes(6);
        let completed_at = started_at + Duration::minutes(i64::from(quote.duration_min));

        let ride = Ride {
            id: id.to_string(),
            passenger_id: passenger_id.to_string(),
            driver_id: Some(driver_id.to_string()),
            vehicle_type,
            status: RideStatus::Completed,
            current_position: dropoff.coordinates,
            pickup,
            dropoff,
            distance_km: quote.distance_km,
            duration_min: quote.duration_min,
            fare: quote.total,
            quoted_rate: quote.rate(),
            surge_multiplier: quote.surge_multiplier,
            settlement: Some(split),
            progress: 100,
            created_at,
            accepted_at: Some(created_at + Duration::minutes(1)),
            arrived_at: Some(created_at + Duration::minutes(5)),
            started_at: Some(started_at),
            completed_at: Some(completed_at),
            cancelled_at: None,
            cancel_reason: None,
            updated_at: completed_at,
        };

        if let Some(driver) = state.drivers.get_mut(driver_id) {
            driver.total_earnings += split.driver_share;
            driver.completed_rides += 1;
            driver.user.wallet_balance += split.driver_share;
            if days_ago == 0 {
                driver.today_earnings += split.driver_share;
            }
        }
        state.platform_revenue += split.commission;
        state.rides.insert(ride.id.clone(), ride);
        rides += 1;
    }

    // One payout waiting for the admin portal
    let withdrawal = WithdrawalRequest {
        id: "wdr-240101-pay01".to_string(),
        driver_id: "drv-240101-kek01".to_string(),
        amount: 2_400.0,
        status: WithdrawalStatus::Pending,
        requested_at: Utc::now() - Duration::hours(5),
        processed_at: None,
    };
    state.withdrawals.insert(withdrawal.id.clone(), withdrawal);

    let summary = SeedSummary {
        users: summary_users,
        drivers: summary_drivers,
        rides,
        withdrawals: 1,
    };
    tracing::info!("Seeded demo data: {:?}", summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_is_loaded_once() {
        let store = StoreService::default();
        let summary = seed_demo_data(&store).await.unwrap();
        assert_eq!(summary.users, 4);
        assert_eq!(summary.drivers, 4);
        assert_eq!(summary.rides, 3);

        assert_eq!(seed_demo_data(&store).await.unwrap(), SeedSummary::default());
        assert_eq!(store.read().await.rides.len(), 3);
    }

    #[tokio::test]
    async fn test_seeded_rides_are_settled_consistently() {
        let store = StoreService::default();
        seed_demo_data(&store).await.unwrap();

        let state = store.read().await;
        for ride in state.rides.values() {
            let split = ride.settlement.unwrap();
            assert!((split.driver_share + split.commission - ride.fare).abs() < 1e-9);
        }
        let okada = &state.drivers["drv-240101-oka01"];
        assert!(okada.today_earnings > 0.0);
        assert_eq!(state.drivers["drv-240101-kek02"].status, DriverStatus::Pending);
    }
}
