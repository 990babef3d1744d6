// src/services/scheduler_service.rs
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{
    sync::{Mutex, RwLock},
    task::AbortHandle,
    time::{self, Instant},
};
use tracing;

use crate::{
    errors::KekeError as AppError,
    services::{fraud_service::FraudService, ride_service::RideOperations, wallet_service::WalletService},
};

/// Pending requests older than this are given up on.
pub const STALE_RIDE_AGE: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    ResetDailyEarnings,
    ExpireStaleRides,
    FraudScan,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [JobKind::ResetDailyEarnings, JobKind::ExpireStaleRides, JobKind::FraudScan];

    pub fn name(&self) -> &'static str {
        match self {
            JobKind::ResetDailyEarnings => "reset-daily-earnings",
            JobKind::ExpireStaleRides => "expire-stale-rides",
            JobKind::FraudScan => "fraud-scan",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn default_interval(&self) -> Duration {
        match self {
            JobKind::ResetDailyEarnings => Duration::from_secs(24 * 60 * 60),
            JobKind::ExpireStaleRides => Duration::from_secs(60),
            JobKind::FraudScan => Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub name: &'static str,
    pub interval_secs: u64,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub last_result: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("unknown job: {0}")]
    UnknownJob(String),

    #[error("job {name} failed: {reason}")]
    JobFailed { name: &'static str, reason: String },

    #[error("job {0} needs an interval of at least one second")]
    InvalidInterval(&'static str),
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::UnknownJob(name) => AppError::JobNotFound(name),
            SchedulerError::JobFailed { .. } => AppError::InternalServer(err.to_string()),
            SchedulerError::InvalidInterval(_) => AppError::validation_error("interval_secs", err.to_string()),
        }
    }
}

struct JobSlot {
    interval: Duration,
    info: JobInfo,
}

/// Runs maintenance jobs on fixed intervals.
///
/// Every job loop keeps ticking while disabled and simply skips its work, so
/// toggling a job takes effect on the next tick without respawning anything.
pub struct SchedulerService {
    jobs: RwLock<HashMap<JobKind, JobSlot>>,
    loops: Mutex<Vec<AbortHandle>>,
    wallet_service: Arc<WalletService>,
    ride_service: Arc<dyn RideOperations>,
    fraud_service: Arc<FraudService>,
}

impl SchedulerService {
    pub fn new(
        wallet_service: Arc<WalletService>,
        ride_service: Arc<dyn RideOperations>,
        fraud_service: Arc<FraudService>,
    ) -> Self {
        let jobs = JobKind::ALL
            .into_iter()
            .map(|kind| {
                let interval = kind.default_interval();
                let info = JobInfo {
                    name: kind.name(),
                    interval_secs: interval.as_secs(),
                    enabled: true,
                    last_run: None,
                    run_count: 0,
                    last_result: None,
                    last_error: None,
                };
                (kind, JobSlot { interval, info })
            })
            .collect();

        Self {
            jobs: RwLock::new(jobs),
            loops: Mutex::new(Vec::new()),
            wallet_service,
            ride_service,
            fraud_service,
        }
    }

    /// Overrides a job interval; takes effect for loops started afterwards.
    pub async fn set_interval(&self, name: &str, interval: Duration) -> Result<JobInfo, SchedulerError> {
        let kind = JobKind::from_name(name).ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;
        if interval < Duration::from_secs(1) {
            return Err(SchedulerError::InvalidInterval(kind.name()));
        }
        let mut jobs = self.jobs.write().await;
        let slot = jobs
            .get_mut(&kind)
            .ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;
        slot.interval = interval;
        slot.info.interval_secs = interval.as_secs();
        tracing::info!("Job {} now runs every {:?}", name, interval);
        Ok(slot.info.clone())
    }

    pub async fn is_running(&self) -> bool {
        !self.loops.lock().await.is_empty()
    }

    pub async fn list_jobs(&self) -> Vec<JobInfo> {
        let jobs = self.jobs.read().await;
        JobKind::ALL
            .iter()
            .filter_map(|kind| jobs.get(kind).map(|slot| slot.info.clone()))
            .collect()
    }

    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<JobInfo, SchedulerError> {
        let kind = JobKind::from_name(name).ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;
        let mut jobs = self.jobs.write().await;
        let slot = jobs
            .get_mut(&kind)
            .ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;
        slot.info.enabled = enabled;
        tracing::info!("Job {} {}", name, if enabled { "enabled" } else { "disabled" });
        Ok(slot.info.clone())
    }

    /// Runs one job now, whether or not it is enabled.
    pub async fn run_job(&self, name: &str) -> Result<JobInfo, SchedulerError> {
        let kind = JobKind::from_name(name).ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;
        self.execute(kind).await
    }

    /// Runs every enabled job concurrently.
    pub async fn run_all(&self) -> Vec<Result<JobInfo, SchedulerError>> {
        let enabled: Vec<JobKind> = {
            let jobs = self.jobs.read().await;
            JobKind::ALL
                .into_iter()
                .filter(|kind| jobs.get(kind).is_some_and(|slot| slot.info.enabled))
                .collect()
        };
        join_all(enabled.into_iter().map(|kind| self.execute(kind))).await
    }

    /// Spawns one loop per job. Calling it twice restarts the loops.
    pub async fn start(self: &Arc<Self>) {
        self.stop().await;

        let intervals: Vec<(JobKind, Duration)> = {
            let jobs = self.jobs.read().await;
            jobs.iter().map(|(kind, slot)| (*kind, slot.interval)).collect()
        };

        let mut loops = self.loops.lock().await;
        for (kind, interval) in intervals {
            let scheduler = Arc::clone(self);
            let handle = tokio::spawn(async move {
                // First run happens one full interval after start
                let mut ticker = time::interval_at(Instant::now() + interval, interval);
                loop {
                    ticker.tick().await;
                    if !scheduler.is_enabled(kind).await {
                        tracing::debug!("Job {} is disabled, skipping", kind.name());
                        continue;
                    }
                    if let Err(e) = scheduler.execute(kind).await {
                        tracing::error!("{}", e);
                    }
                }
            });
            loops.push(handle.abort_handle());
            tracing::info!("Scheduled {} every {:?}", kind.name(), interval);
        }
    }

    pub async fn stop(&self) {
        for handle in self.loops.lock().await.drain(..) {
            handle.abort();
        }
    }

    async fn is_enabled(&self, kind: JobKind) -> bool {
        self.jobs.read().await.get(&kind).is_some_and(|slot| slot.info.enabled)
    }

    async fn execute(&self, kind: JobKind) -> Result<JobInfo, SchedulerError> {
        tracing::info!("Running job {}", kind.name());

        let outcome: Result<String, AppError> = match kind {
            JobKind::ResetDailyEarnings => {
                let reset = self.wallet_service.reset_daily_earnings().await;
                Ok(format!("reset earnings for {} drivers", reset))
            }
            JobKind::ExpireStaleRides => self
                .ride_service
                .expire_stale_rides(STALE_RIDE_AGE)
                .await
                .map(|expired| format!("expired {} rides", expired)),
            JobKind::FraudScan => self
                .fraud_service
                .scan_all()
                .await
                .map(|alerts| format!("{} alerts raised", alerts.len())),
        };

        let mut jobs = self.jobs.write().await;
        let slot = jobs
            .get_mut(&kind)
            .ok_or_else(|| SchedulerError::UnknownJob(kind.name().to_string()))?;
        slot.info.last_run = Some(Utc::now());
        slot.info.run_count += 1;

        match outcome {
            Ok(summary) => {
                tracing::info!("Job {} finished: {}", kind.name(), summary);
                slot.info.last_result = Some(summary);
                slot.info.last_error = None;
                Ok(slot.info.clone())
            }
            Err(e) => {
                slot.info.last_error = Some(e.to_string());
                Err(SchedulerError::JobFailed {
                    name: kind.name(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
