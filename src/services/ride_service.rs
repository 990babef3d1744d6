// src/services/ride_service.rs
use async_trait::async_trait;
use chrono::Utc;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    sync::Mutex,
    task::AbortHandle,
    time::{self, Instant},
};
use tracing;

use crate::{
    errors::KekeError as AppError,
    models::{
        notification::NotificationKind,
        pricing::{FareQuote, FareSplit, VehicleType},
        ride::{Ride, RideEstimateRequest, RideRequest, RideStatus},
    },
    services::{
        messaging_service::{NotificationMessage, NotificationService},
        pricing_service::quote_ride,
        store_service::{StoreService, StoreState},
        wallet_service::settle_ride,
    },
    utils::id_generator::{IdGenerator, IdType, WithGeneratedId},
};

/// Offsets of the simulated passenger-side trip, measured from booking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationTimings {
    pub driver_found_after: Duration,
    pub driver_arrived_after: Duration,
    pub trip_started_after: Duration,
    pub trip_completed_after: Duration,
    pub progress_tick: Duration,
    pub progress_step: u8,
}

impl Default for SimulationTimings {
    fn default() -> Self {
        Self {
            driver_found_after: Duration::from_secs(3),
            driver_arrived_after: Duration::from_secs(8),
            trip_started_after: Duration::from_secs(12),
            trip_completed_after: Duration::from_secs(28),
            progress_tick: Duration::from_millis(800),
            progress_step: 5,
        }
    }
}

#[async_trait]
pub trait RideOperations: Send + Sync {
    async fn estimate_ride(&self, request: RideEstimateRequest) -> Result<FareQuote, AppError>;
    async fn book_ride(&self, request: RideRequest) -> Result<Ride, AppError>;
    async fn get_ride(&self, ride_id: &str) -> Result<Option<Ride>, AppError>;
    async fn get_rides_for_user(&self, user_id: &str) -> Result<Vec<Ride>, AppError>;
    async fn list_pending_rides(&self, vehicle_type: Option<VehicleType>) -> Result<Vec<Ride>, AppError>;
    async fn cancel_ride(&self, ride_id: &str, reason: Option<String>) -> Result<Ride, AppError>;
    async fn accept_ride(&self, ride_id: &str, driver_id: &str) -> Result<Ride, AppError>;
    async fn mark_arrived(&self, ride_id: &str, driver_id: &str) -> Result<Ride, AppError>;
    async fn start_trip(&self, ride_id: &str, driver_id: &str) -> Result<Ride, AppError>;
    async fn complete_trip(&self, ride_id: &str, driver_id: &str) -> Result<Ride, AppError>;
    async fn expire_stale_rides(&self, max_age: Duration) -> Result<usize, AppError>;
}

/// Who is asking for a status change.
enum Actor<'a> {
    /// Simulated dispatch: picks a driver when moving out of `Pending`.
    Dispatcher,
    /// Timer-driven steps of the simulation.
    System,
    /// A driver claiming a pending ride.
    Claiming(&'a str),
    /// The driver already assigned to the ride.
    Driver(&'a str),
    Passenger,
}

/// The part of the ride service shared with simulation tasks.
#[derive(Clone)]
struct RideLifecycle {
    store: Arc<StoreService>,
    notification_service: Arc<dyn NotificationService>,
}

impl RideLifecycle {
    /// Applies one status change under the store lock, settles on completion,
    /// then notifies once the lock is released.
    async fn apply(
        &self,
        ride_id: &str,
        next: RideStatus,
        actor: Actor<'_>,
        cancel_reason: Option<String>,
    ) -> Result<Ride, AppError> {
        let (ride, newly_assigned, split) = {
            let mut state = self.store.write().await;
            let current = state
                .rides
                .get(ride_id)
                .ok_or_else(|| AppError::ride_not_found(ride_id))?;

            if !current.status.can_transition_to(next) {
                return Err(AppError::invalid_transition("ride", current.status, next));
            }

            let newly_assigned = match actor {
                // A driver who already claimed the ride keeps it
                Actor::Dispatcher => match current.driver_id {
                    Some(_) => None,
                    None => Some(
                        pick_driver(&state, current.vehicle_type)
                            .ok_or_else(|| AppError::NoDriverAvailable(format!("{:?}", current.vehicle_type)))?,
                    ),
                },
                Actor::Claiming(driver_id) => {
                    let driver = state
                        .drivers
                        .get(driver_id)
                        .ok_or_else(|| AppError::driver_not_found(driver_id))?;
                    if !driver.is_available() {
                        return Err(AppError::DriverNotAvailable(driver_id.to_string()));
                    }
                    Some(driver_id.to_string())
                }
                Actor::Driver(driver_id) => {
                    if current.driver_id.as_deref() != Some(driver_id) {
                        return Err(AppError::DriverNotAssigned {
                            ride_id: ride_id.to_string(),
                            driver_id: driver_id.to_string(),
                        });
                    }
                    None
                }
                Actor::System | Actor::Passenger => None,
            };

            let ride = state
                .rides
                .get_mut(ride_id)
                .ok_or_else(|| AppError::ride_not_found(ride_id))?;
            ride.transition(next)
                .map_err(|(from, to)| AppError::invalid_transition("ride", from, to))?;
            if let Some(driver_id) = &newly_assigned {
                ride.driver_id = Some(driver_id.clone());
            }
            if next == RideStatus::Cancelled {
                ride.cancel_reason = cancel_reason;
            }

            let split = if next == RideStatus::Completed {
                settle_ride(&mut state, ride_id)?
            } else {
                None
            };

            let ride = state
                .rides
                .get(ride_id)
                .cloned()
                .ok_or_else(|| AppError::ride_not_found(ride_id))?;
            (ride, newly_assigned, split)
        };

        tracing::info!("Ride {} is now {:?}", ride.id, ride.status);
        self.notify(&ride, newly_assigned.as_deref(), split.as_ref()).await;
        Ok(ride)
    }

    async fn notify(&self, ride: &Ride, newly_assigned: Option<&str>, split: Option<&FareSplit>) {
        if let Err(e) = self.notification_service.notify_ride_status_update(ride).await {
            tracing::warn!("Failed to notify passenger of ride {}: {}", ride.id, e);
        }
        if let Some(driver_id) = newly_assigned {
            if let Err(e) = self.notification_service.notify_driver_assigned(ride, driver_id).await {
                tracing::warn!("Failed to notify driver {}: {}", driver_id, e);
            }
        }
        if let (Some(split), Some(driver_id)) = (split, ride.driver_id.as_deref()) {
            if let Err(e) = self.notification_service.notify_ride_earnings(ride, driver_id, split).await {
                tracing::warn!("Failed to notify driver {} of earnings: {}", driver_id, e);
            }
        }
    }

    async fn advance_progress(&self, ride_id: &str, step: u8) -> bool {
        let mut state = self.store.write().await;
        match state.rides.get_mut(ride_id) {
            Some(ride) if ride.status == RideStatus::InProgress => {
                ride.advance_progress(step);
                tracing::debug!("Ride {} progress {}%", ride_id, ride.progress);
                true
            }
            _ => false,
        }
    }
}

/// First active driver with the right vehicle who is not already on a trip.
fn pick_driver(state: &StoreState, vehicle_type: VehicleType) -> Option<String> {
    let mut candidates: Vec<&str> = state
        .drivers
        .values()
        .filter(|driver| driver.is_available() && driver.vehicle_type == vehicle_type)
        .map(|driver| driver.id())
        .filter(|driver_id| {
            !state.rides.values().any(|ride| {
                !ride.status.is_terminal() && ride.status != RideStatus::Pending && ride.driver_id.as_deref() == Some(*driver_id)
            })
        })
        .collect();
    candidates.sort();
    candidates.first().map(|id| id.to_string())
}

/// Drives a booked ride through the timed passenger-side steps.
///
/// Every step re-checks the ride under the store lock, so a ride that was
/// cancelled or taken over by a driver stops the simulation at its next step
/// even if the abort arrives late. While no driver is free the ride stays
/// `Pending` and dispatch is retried every progress tick; the later steps
/// shift by however long the search took.
async fn run_simulation(lifecycle: RideLifecycle, ride_id: String, timings: SimulationTimings) {
    let booked_at = Instant::now();
    let mut search_delay = Duration::ZERO;

    loop {
        time::sleep_until(booked_at + timings.driver_found_after + search_delay).await;
        match lifecycle.apply(&ride_id, RideStatus::Arriving, Actor::Dispatcher, None).await {
            Ok(_) => break,
            Err(AppError::NoDriverAvailable(vehicle)) => {
                tracing::debug!("No {} driver free for ride {}, still searching", vehicle, ride_id);
                search_delay += timings.progress_tick;
            }
            Err(e) => {
                tracing::debug!("Simulation for ride {} stopped: {}", ride_id, e);
                return;
            }
        }
    }

    let origin = booked_at + search_delay;
    for (offset, next) in [
        (timings.driver_arrived_after, RideStatus::Arrived),
        (timings.trip_started_after, RideStatus::InProgress),
    ] {
        time::sleep_until(origin + offset).await;
        if let Err(e) = lifecycle.apply(&ride_id, next, Actor::System, None).await {
            tracing::debug!("Simulation for ride {} stopped: {}", ride_id, e);
            return;
        }
    }

    // Progress ticks run independently of the completion deadline
    let started_at = origin + timings.trip_started_after;
    let mut ticker = time::interval_at(started_at + timings.progress_tick, timings.progress_tick);
    let deadline = time::sleep_until(origin + timings.trip_completed_after);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            _ = &mut deadline => break,
            _ = ticker.tick() => {
                if !lifecycle.advance_progress(&ride_id, timings.progress_step).await {
                    return;
                }
            }
        }
    }

    if let Err(e) = lifecycle.apply(&ride_id, RideStatus::Completed, Actor::System, None).await {
        tracing::debug!("Simulation for ride {} could not complete: {}", ride_id, e);
    }
}

pub struct RideService {
    lifecycle: RideLifecycle,
    timings: SimulationTimings,
    auto_dispatch: bool,
    simulations: Arc<Mutex<HashMap<String, AbortHandle>>>,
}

impl RideService {
    pub fn new(
        store: Arc<StoreService>,
        notification_service: Arc<dyn NotificationService>,
        timings: SimulationTimings,
        auto_dispatch: bool,
    ) -> Self {
        Self {
            lifecycle: RideLifecycle {
                store,
                notification_service,
            },
            timings,
            auto_dispatch,
            simulations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn store(&self) -> &StoreService {
        &self.lifecycle.store
    }

    async fn spawn_simulation(&self, ride_id: &str) {
        let lifecycle = self.lifecycle.clone();
        let simulations = self.simulations.clone();
        let timings = self.timings;
        let id = ride_id.to_string();

        // Holding the map lock while spawning keeps the task from removing
        // its entry before it is inserted.
        let mut running = self.simulations.lock().await;
        let handle = tokio::spawn(async move {
            run_simulation(lifecycle, id.clone(), timings).await;
            simulations.lock().await.remove(&id);
        });
        running.insert(ride_id.to_string(), handle.abort_handle());
        tracing::debug!("Simulation started for ride {}", ride_id);
    }

    async fn stop_simulation(&self, ride_id: &str) {
        if let Some(handle) = self.simulations.lock().await.remove(ride_id) {
            handle.abort();
            tracing::debug!("Simulation stopped for ride {}", ride_id);
        }
    }

    /// Number of rides whose timers are still pending.
    pub async fn active_simulations(&self) -> usize {
        self.simulations.lock().await.len()
    }
}

#[async_trait]
impl RideOperations for RideService {
    async fn estimate_ride(&self, request: RideEstimateRequest) -> Result<FareQuote, AppError> {
        let settings = self.store().settings().await;
        quote_ride(&settings, &request)
    }

    async fn book_ride(&self, request: RideRequest) -> Result<Ride, AppError> {
        tracing::info!("Booking {:?} ride for passenger: {}", request.vehicle_type, request.passenger_id);

        if request.pickup.address.trim().is_empty() {
            return Err(AppError::MissingRequiredField("pickup.address".to_string()));
        }
        if request.dropoff.address.trim().is_empty() {
            return Err(AppError::MissingRequiredField("dropoff.address".to_string()));
        }
        if self.store().get_user(&request.passenger_id).await.is_none() {
            return Err(AppError::user_not_found(&request.passenger_id));
        }

        let quote = self.estimate_ride(request.estimate_request()).await?;
        let now = Utc::now();
        let ride = Ride {
            id: String::new(),
            passenger_id: request.passenger_id,
            driver_id: None,
            vehicle_type: request.vehicle_type,
            status: RideStatus::Pending,
            pickup: request.pickup,
            dropoff: request.dropoff,
            distance_km: quote.distance_km,
            duration_min: quote.duration_min,
            fare: quote.total,
            quoted_rate: quote.rate(),
            surge_multiplier: quote.surge_multiplier,
            settlement: None,
            progress: 0,
            current_position: None,
            created_at: now,
            accepted_at: None,
            arrived_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            cancel_reason: None,
            updated_at: now,
        }
        .with_generated_id(IdType::Ride);

        self.store().insert_ride(ride.clone()).await;
        tracing::info!("Ride booked: {} - {:.2} {}", ride.id, ride.fare, quote.currency);

        if let Err(e) = self.lifecycle.notification_service.notify_ride_status_update(&ride).await {
            tracing::warn!("Failed to notify passenger of ride {}: {}", ride.id, e);
        }
        if self.auto_dispatch {
            self.spawn_simulation(&ride.id).await;
        }

        Ok(ride)
    }

    async fn get_ride(&self, ride_id: &str) -> Result<Option<Ride>, AppError> {
        if !IdGenerator::validate_id(ride_id, Some(IdType::Ride)) {
            tracing::warn!("Invalid ride ID format: {}", ride_id);
            return Ok(None);
        }

        tracing::debug!("Getting ride: {}", ride_id);
        Ok(self.store().get_ride(ride_id).await)
    }

    async fn get_rides_for_user(&self, user_id: &str) -> Result<Vec<Ride>, AppError> {
        tracing::debug!("Getting rides for user: {}", user_id);

        let state = self.store().read().await;
        let mut rides: Vec<Ride> = state
            .rides
            .values()
            .filter(|ride| ride.passenger_id == user_id || ride.driver_id.as_deref() == Some(user_id))
            .cloned()
            .collect();

        // Sort by creation date (newest first)
        rides.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rides)
    }

    async fn list_pending_rides(&self, vehicle_type: Option<VehicleType>) -> Result<Vec<Ride>, AppError> {
        let state = self.store().read().await;
        let mut rides: Vec<Ride> = state
            .rides
            .values()
            .filter(|ride| ride.status == RideStatus::Pending)
            .filter(|ride| vehicle_type.is_none_or(|v| ride.vehicle_type == v))
            .cloned()
            .collect();
        rides.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rides)
    }

    async fn cancel_ride(&self, ride_id: &str, reason: Option<String>) -> Result<Ride, AppError> {
        tracing::info!("Cancelling ride: {}", ride_id);

        let ride = self
            .lifecycle
            .apply(ride_id, RideStatus::Cancelled, Actor::Passenger, reason)
            .await?;
        self.stop_simulation(ride_id).await;

        if let Some(driver_id) = ride.driver_id.as_deref() {
            let message = NotificationMessage::new(
                NotificationKind::RideStatus,
                "Ride cancelled",
                &format!("The passenger cancelled the ride from {}", ride.pickup.address),
            );
            if let Err(e) = self.lifecycle.notification_service.send_to_user(driver_id, message).await {
                tracing::warn!("Failed to notify driver {} of cancellation: {}", driver_id, e);
            }
        }
        Ok(ride)
    }

    async fn accept_ride(&self, ride_id: &str, driver_id: &str) -> Result<Ride, AppError> {
        tracing::info!("Driver {} accepting ride {}", driver_id, ride_id);
        let ride = self
            .lifecycle
            .apply(ride_id, RideStatus::Accepted, Actor::Claiming(driver_id), None)
            .await?;
        self.stop_simulation(ride_id).await;
        Ok(ride)
    }

    async fn mark_arrived(&self, ride_id: &str, driver_id: &str) -> Result<Ride, AppError> {
        let ride = self
            .lifecycle
            .apply(ride_id, RideStatus::Arrived, Actor::Driver(driver_id), None)
            .await?;
        self.stop_simulation(ride_id).await;
        Ok(ride)
    }

    async fn start_trip(&self, ride_id: &str, driver_id: &str) -> Result<Ride, AppError> {
        let ride = self
            .lifecycle
            .apply(ride_id, RideStatus::InProgress, Actor::Driver(driver_id), None)
            .await?;
        self.stop_simulation(ride_id).await;
        Ok(ride)
    }

    async fn complete_trip(&self, ride_id: &str, driver_id: &str) -> Result<Ride, AppError> {
        let ride = self
            .lifecycle
            .apply(ride_id, RideStatus::Completed, Actor::Driver(driver_id), None)
            .await?;
        self.stop_simulation(ride_id).await;
        Ok(ride)
    }

    async fn expire_stale_rides(&self, max_age: Duration) -> Result<usize, AppError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_age).map_err(|e| AppError::internal_error(e.to_string()))?;

        let stale: Vec<String> = {
            let state = self.store().read().await;
            state
                .rides
                .values()
                .filter(|ride| ride.status == RideStatus::Pending && ride.created_at < cutoff)
                .map(|ride| ride.id.clone())
                .collect()
        };

        let mut expired = 0;
        for ride_id in stale {
            let reason = Some("No driver found nearby".to_string());
            match self.lifecycle.apply(&ride_id, RideStatus::Cancelled, Actor::System, reason).await {
                Ok(_) => {
                    self.stop_simulation(&ride_id).await;
                    expired += 1;
                }
                // Picked up by a driver in the meantime
                Err(e) => tracing::debug!("Ride {} not expired: {}", ride_id, e),
            }
        }

        if expired > 0 {
            tracing::info!("Expired {} stale ride requests", expired);
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        driver::{Driver, DriverStatus},
        ride::{Coordinates, Place},
        user::{Role, User},
    };
    use crate::services::messaging_service::InAppNotificationService;

    const PASSENGER: &str = "usr-261016-aaaaa";
    const DRIVER: &str = "drv-261016-bbbbb";

    async fn setup(auto_dispatch: bool) -> (Arc<StoreService>, RideService) {
        let store = Arc::new(StoreService::default());

        let mut passenger = User::new("Ada".into(), "ada@keke.ng".into(), "0801".into(), Role::Passenger);
        passenger.id = PASSENGER.into();
        passenger.wallet_balance = 2000.0;
        store.insert_user(passenger).await;

        let mut user = User::new("Musa".into(), "musa@keke.ng".into(), "0803".into(), Role::Driver);
        user.id = DRIVER.into();
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

        let notifications = Arc::new(InAppNotificationService::new(store.clone()));
        let service = RideService::new(store.clone(), notifications, SimulationTimings::default(), auto_dispatch);
        (store, service)
    }

    fn request() -> RideRequest {
        RideRequest {
            passenger_id: PASSENGER.into(),
            pickup: Place {
                address: "A".into(),
                coordinates: None,
            },
            dropoff: Place {
                address: "B".into(),
                coordinates: None,
            },
            vehicle_type: VehicleType::Keke,
            distance_km: Some(5.0),
        }
    }

    async fn status_of(store: &StoreService, ride_id: &str) -> RideStatus {
        store.get_ride(ride_id).await.unwrap().status
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_ride_walks_every_state() {
        let (store, service) = setup(true).await;
        let ride = service.book_ride(request()).await.unwrap();
        assert_eq!(ride.status, RideStatus::Pending);
        assert_eq!(ride.fare, 700.0);

        time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(status_of(&store, &ride.id).await, RideStatus::Arriving);
        assert_eq!(store.get_ride(&ride.id).await.unwrap().driver_id.as_deref(), Some(DRIVER));

        time::sleep(Duration::from_secs(5)).await; // 8.1s
        assert_eq!(status_of(&store, &ride.id).await, RideStatus::Arrived);

        time::sleep(Duration::from_secs(4)).await; // 12.1s
        assert_eq!(status_of(&store, &ride.id).await, RideStatus::InProgress);

        time::sleep(Duration::from_secs(8)).await; // 20.1s, ten ticks in
        let halfway = store.get_ride(&ride.id).await.unwrap();
        assert_eq!(halfway.status, RideStatus::InProgress);
        assert_eq!(halfway.progress, 50);

        time::sleep(Duration::from_secs(8)).await; // 28.1s
        let done = store.get_ride(&ride.id).await.unwrap();
        assert_eq!(done.status, RideStatus::Completed);
        assert_eq!(done.progress, 100);

        let split = done.settlement.unwrap();
        assert!((split.driver_share + split.commission - done.fare).abs() < 1e-9);
        assert_eq!(store.get_user(PASSENGER).await.unwrap().wallet_balance, 1300.0);
        assert_eq!(store.get_driver(DRIVER).await.unwrap().today_earnings, split.driver_share);
        assert_eq!(service.active_simulations().await, 0);

        // Nothing left to fire, and completion cannot be applied twice
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(store.get_driver(DRIVER).await.unwrap().completed_rides, 1);
        assert!(service.complete_trip(&ride.id, DRIVER).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_searching_stops_timers() {
        let (store, service) = setup(true).await;
        let ride = service.book_ride(request()).await.unwrap();

        time::sleep(Duration::from_secs(1)).await;
        let cancelled = service.cancel_ride(&ride.id, Some("Changed my mind".into())).await.unwrap();
        assert_eq!(cancelled.status, RideStatus::Cancelled);
        assert_eq!(service.active_simulations().await, 0);

        time::sleep(Duration::from_secs(60)).await;
        let ride = store.get_ride(&ride.id).await.unwrap();
        assert_eq!(ride.status, RideStatus::Cancelled);
        assert!(ride.driver_id.is_none());
        assert_eq!(store.get_user(PASSENGER).await.unwrap().wallet_balance, 2000.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_arriving_stops_timers() {
        let (store, service) = setup(true).await;
        let ride = service.book_ride(request()).await.unwrap();

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(status_of(&store, &ride.id).await, RideStatus::Arriving);
        service.cancel_ride(&ride.id, None).await.unwrap();

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(status_of(&store, &ride.id).await, RideStatus::Cancelled);
        assert_eq!(store.get_driver(DRIVER).await.unwrap().completed_rides, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cannot_cancel_in_progress() {
        let (_store, service) = setup(true).await;
        let ride = service.book_ride(request()).await.unwrap();

        time::sleep(Duration::from_secs(13)).await;
        let result = service.cancel_ride(&ride.id, None).await;
        assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_driver_button_flow() {
        let (store, service) = setup(false).await;
        let ride = service.book_ride(request()).await.unwrap();
        assert_eq!(service.list_pending_rides(Some(VehicleType::Keke)).await.unwrap().len(), 1);

        let accepted = service.accept_ride(&ride.id, DRIVER).await.unwrap();
        assert_eq!(accepted.status, RideStatus::Accepted);
        assert_eq!(accepted.driver_id.as_deref(), Some(DRIVER));

        // Only the assigned driver can move the ride along
        let stranger = service.mark_arrived(&ride.id, "drv-261016-zzzzz").await;
        assert!(matches!(stranger, Err(AppError::DriverNotAssigned { .. })));

        service.mark_arrived(&ride.id, DRIVER).await.unwrap();
        service.start_trip(&ride.id, DRIVER).await.unwrap();
        let done = service.complete_trip(&ride.id, DRIVER).await.unwrap();
        assert_eq!(done.status, RideStatus::Completed);

        let driver = store.get_driver(DRIVER).await.unwrap();
        assert_eq!(driver.today_earnings, 560.0);
        assert_eq!(driver.user.wallet_balance, 560.0);
        assert_eq!(store.read().await.platform_revenue, 140.0);
        assert!(!store.notifications_for(DRIVER).await.is_empty());
    }

    #[tokio::test]
    async fn test_suspended_driver_cannot_accept() {
        let (store, service) = setup(false).await;
        store.write().await.drivers.get_mut(DRIVER).unwrap().status = DriverStatus::Suspended;
        let ride = service.book_ride(request()).await.unwrap();

        let result = service.accept_ride(&ride.id, DRIVER).await;
        assert!(matches!(result, Err(AppError::DriverNotAvailable(_))));
    }

    #[tokio::test]
    async fn test_book_ride_validation() {
        let (_store, service) = setup(false).await;

        let mut unknown = request();
        unknown.passenger_id = "usr-261016-zzzzz".into();
        assert!(matches!(service.book_ride(unknown).await, Err(AppError::UserNotFound(_))));

        let mut blank = request();
        blank.pickup.address = "  ".into();
        assert!(matches!(service.book_ride(blank).await, Err(AppError::MissingRequiredField(_))));
    }

    #[tokio::test]
    async fn test_expire_stale_rides() {
        let (store, service) = setup(false).await;
        let ride = service.book_ride(request()).await.unwrap();
        store.write().await.rides.get_mut(&ride.id).unwrap().created_at = Utc::now() - chrono::Duration::minutes(30);

        assert_eq!(service.expire_stale_rides(Duration::from_secs(600)).await.unwrap(), 1);
        assert_eq!(status_of(&store, &ride.id).await, RideStatus::Cancelled);
        assert_eq!(service.expire_stale_rides(Duration::from_secs(600)).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_moves_towards_dropoff() {
        let (store, service) = setup(true).await;
        let mut req = request();
        req.pickup.coordinates = Some(Coordinates { latitude: 6.50, longitude: 3.30 });
        req.dropoff.coordinates = Some(Coordinates { latitude: 6.60, longitude: 3.40 });
        let ride = service.book_ride(req).await.unwrap();

        time::sleep(Duration::from_millis(12100)).await;
        let started = store.get_ride(&ride.id).await.unwrap();
        assert_eq!(started.current_position, started.pickup.coordinates);

        time::sleep(Duration::from_secs(4)).await; // five ticks
        let moving = store.get_ride(&ride.id).await.unwrap();
        let position = moving.current_position.unwrap();
        assert_eq!(moving.progress, 25);
        assert!((position.latitude - 6.525).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ride_waits_for_a_free_driver() {
        let (store, service) = setup(true).await;
        store.write().await.drivers.get_mut(DRIVER).unwrap().status = DriverStatus::Suspended;
        let ride = service.book_ride(request()).await.unwrap();

        time::sleep(Duration::from_secs(10)).await;
        let searching = store.get_ride(&ride.id).await.unwrap();
        assert_eq!(searching.status, RideStatus::Pending);
        assert!(searching.driver_id.is_none());
        assert_eq!(service.active_simulations().await, 1);

        store.write().await.drivers.get_mut(DRIVER).unwrap().status = DriverStatus::Active;
        time::sleep(Duration::from_secs(1)).await; // next retry at 10.2s
        let found = store.get_ride(&ride.id).await.unwrap();
        assert_eq!(found.status, RideStatus::Arriving);
        assert_eq!(found.driver_id.as_deref(), Some(DRIVER));

        time::sleep(Duration::from_secs(60)).await;
        let done = store.get_ride(&ride.id).await.unwrap();
        assert_eq!(done.status, RideStatus::Completed);
        assert_eq!(store.get_user(PASSENGER).await.unwrap().wallet_balance, 1300.0);
        assert_eq!(store.get_driver(DRIVER).await.unwrap().today_earnings, 560.0);
    }

    #[tokio::test]
    async fn test_dispatch_keeps_the_accepting_driver() {
        let (store, service) = setup(false).await;
        let mut user = User::new("Ife".into(), "ife@keke.ng".into(), "0804".into(), Role::Driver);
        user.id = "drv-261016-aaaaa".into();
        store
            .insert_driver(Driver {
                user,
                vehicle_type: VehicleType::Keke,
                plate: "LAG-999-KJ".into(),
                rating: 4.9,
                status: DriverStatus::Active,
                total_earnings: 0.0,
                today_earnings: 0.0,
                completed_rides: 0,
            })
            .await;

        let ride = service.book_ride(request()).await.unwrap();
        service.accept_ride(&ride.id, DRIVER).await.unwrap();

        // A dispatch step landing right after the accept must not reassign
        let arriving = service
            .lifecycle
            .apply(&ride.id, RideStatus::Arriving, Actor::Dispatcher, None)
            .await
            .unwrap();
        assert_eq!(arriving.status, RideStatus::Arriving);
        assert_eq!(arriving.driver_id.as_deref(), Some(DRIVER));
    }
}
