// src/models/ride.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use super::pricing::{FareSplit, VehicleRate, VehicleType};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Point `fraction` of the way from `self` to `target` on a straight line.
    pub fn interpolate(&self, target: &Coordinates, fraction: f64) -> Coordinates {
        let fraction = fraction.clamp(0.0, 1.0);
        Coordinates {
            latitude: self.latitude + (target.latitude - self.latitude) * fraction,
            longitude: self.longitude + (target.longitude - self.longitude) * fraction,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Place {
    pub address: String,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Pending,    // Searching for a driver
    Accepted,   // Driver accepted from the driver portal
    Arriving,   // Driver heading to pickup
    Arrived,    // Driver waiting at pickup
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn can_transition_to(self, next: RideStatus) -> bool {
        use RideStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted | Arriving | Cancelled)
                | (Accepted, Arriving | Arrived | Cancelled)
                | (Arriving, Arrived | Cancelled)
                | (Arrived, InProgress | Cancelled)
                | (InProgress, Completed)
        )
    }

    pub fn is_cancellable(self) -> bool {
        self.can_transition_to(RideStatus::Cancelled)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Ride {
    pub id: String,
    pub passenger_id: String,
    pub driver_id: Option<String>,
    pub vehicle_type: VehicleType,
    pub status: RideStatus,

    pub pickup: Place,
    pub dropoff: Place,
    pub distance_km: f64,
    pub duration_min: i32,

    pub fare: f64,
    pub quoted_rate: VehicleRate, // Rates in force at booking
    pub surge_multiplier: f64,
    pub settlement: Option<FareSplit>, // Set exactly once, on completion

    // Trip progress while in progress
    pub progress: u8,
    pub current_position: Option<Coordinates>,

    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Ride {
    /// Applies a status change and stamps the matching timestamp.
    pub fn transition(&mut self, next: RideStatus) -> Result<(), (RideStatus, RideStatus)> {
        if !self.status.can_transition_to(next) {
            return Err((self.status, next));
        }

        let now = Utc::now();
        match next {
            RideStatus::Accepted | RideStatus::Arriving => {
                self.accepted_at.get_or_insert(now);
            }
            RideStatus::Arrived => self.arrived_at = Some(now),
            RideStatus::InProgress => {
                self.started_at = Some(now);
                self.current_position = self.pickup.coordinates;
            }
            RideStatus::Completed => {
                self.completed_at = Some(now);
                self.progress = 100;
                self.current_position = self.dropoff.coordinates;
            }
            RideStatus::Cancelled => self.cancelled_at = Some(now),
            RideStatus::Pending => {}
        }

        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Fare the booking-time rates give for this distance and surge.
    pub fn quoted_fare(&self) -> f64 {
        (self.quoted_rate.base_fare + self.quoted_rate.per_km * self.distance_km) * self.surge_multiplier
    }

    /// Adds `step` percent of trip progress and moves the marker along the route.
    pub fn advance_progress(&mut self, step: u8) {
        self.progress = self.progress.saturating_add(step).min(100);
        if let (Some(from), Some(to)) = (self.pickup.coordinates, self.dropoff.coordinates) {
            self.current_position = Some(from.interpolate(&to, f64::from(self.progress) / 100.0));
        }
        self.updated_at = Utc::now();
    }
}

// Request/Response Models
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RideEstimateRequest {
    pub pickup: Place,
    pub dropoff: Place,
    pub vehicle_type: VehicleType,
    pub distance_km: Option<f64>, // Used when either place has no coordinates
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RideRequest {
    pub passenger_id: String,
    pub pickup: Place,
    pub dropoff: Place,
    pub vehicle_type: VehicleType,
    pub distance_km: Option<f64>,
}

impl RideRequest {
    pub fn estimate_request(&self) -> RideEstimateRequest {
        RideEstimateRequest {
            pickup: self.pickup.clone(),
            dropoff: self.dropoff.clone(),
            vehicle_type: self.vehicle_type,
            distance_km: self.distance_km,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DriverAction {
    pub driver_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ride(pickup: Option<Coordinates>, dropoff: Option<Coordinates>) -> Ride {
        let now = Utc::now();
        Ride {
            id: "rid-261016-a1b2c".into(),
            passenger_id: "usr-261016-a1b2c".into(),
            driver_id: None,
            vehicle_type: VehicleType::Keke,
            status: RideStatus::Pending,
            pickup: Place { address: "A".into(), coordinates: pickup },
            dropoff: Place { address: "B".into(), coordinates: dropoff },
            distance_km: 5.0,
            duration_min: 10,
            fare: 700.0,
            quoted_rate: VehicleRate { base_fare: 200.0, per_km: 100.0 },
            surge_multiplier: 1.0,
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
    }

    #[test]
    fn test_transition_table() {
        use RideStatus::*;
        assert!(Pending.can_transition_to(Arriving));
        assert!(Pending.can_transition_to(Accepted));
        assert!(Arrived.can_transition_to(Cancelled));
        assert!(!InProgress.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Completed));
        assert!(!Cancelled.can_transition_to(Arriving));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn test_completed_only_once() {
        let mut ride = ride(None, None);
        for status in [RideStatus::Arriving, RideStatus::Arrived, RideStatus::InProgress, RideStatus::Completed] {
            ride.transition(status).unwrap();
        }
        assert_eq!(ride.progress, 100);
        assert_eq!(
            ride.transition(RideStatus::Completed),
            Err((RideStatus::Completed, RideStatus::Completed))
        );
    }

    #[test]
    fn test_progress_interpolates_marker() {
        let pickup = Coordinates { latitude: 6.0, longitude: 3.0 };
        let dropoff = Coordinates { latitude: 7.0, longitude: 4.0 };
        let mut ride = ride(Some(pickup), Some(dropoff));

        for _ in 0..10 {
            ride.advance_progress(5);
        }
        assert_eq!(ride.progress, 50);
        let position = ride.current_position.unwrap();
        assert!((position.latitude - 6.5).abs() < 1e-9);
        assert!((position.longitude - 3.5).abs() < 1e-9);

        for _ in 0..30 {
            ride.advance_progress(5);
        }
        assert_eq!(ride.progress, 100);
        assert_eq!(ride.current_position, Some(dropoff));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&RideStatus::InProgress).unwrap(), "\"IN_PROGRESS\"");
        assert_eq!(serde_json::from_str::<RideStatus>("\"PENDING\"").unwrap(), RideStatus::Pending);
    }
}
