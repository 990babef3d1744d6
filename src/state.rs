// src/state.rs
use std::sync::Arc;

use crate::{
    config::AppConfig,
    services::{
        admin_service::AdminService,
        ai_service::{AiService, GeminiClient, GeminiConfig, TextGenerator},
        driver_service::DriverService,
        fraud_service::FraudService,
        logistics_service::LogisticsService,
        messaging_service::{InAppNotificationService, NotificationService},
        pricing_service::PricingService,
        ride_service::{RideService, SimulationTimings},
        scheduler_service::SchedulerService,
        store_service::StoreService,
        user_service::UserService,
        wallet_service::WalletService,
    },
};

pub struct AppState {
    pub store: Arc<StoreService>,
    pub user_service: Arc<UserService>,
    pub driver_service: Arc<DriverService>,
    pub ride_service: Arc<RideService>,
    pub pricing_service: Arc<PricingService>,
    pub wallet_service: Arc<WalletService>,
    pub logistics_service: Arc<LogisticsService>,
    pub fraud_service: Arc<FraudService>,
    pub ai_service: Arc<AiService>,
    pub admin_service: Arc<AdminService>,
    pub scheduler: Arc<SchedulerService>,
    pub notification_service: Arc<dyn NotificationService>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self::with_timings(config, SimulationTimings::default())
    }

    pub fn with_timings(config: AppConfig, timings: SimulationTimings) -> Self {
        let store = Arc::new(StoreService::new(config.platform_settings()));
        let notification_service: Arc<dyn NotificationService> =
            Arc::new(InAppNotificationService::new(store.clone()));

        let generator: Option<Arc<dyn TextGenerator>> = match &config.gemini_api_key {
            Some(api_key) => Some(Arc::new(GeminiClient::new(GeminiConfig {
                api_key: api_key.clone(),
                model: config.gemini_model.clone(),
                base_url: config.gemini_base_url.clone(),
            }))),
            None => {
                tracing::warn!("GEMINI_API_KEY not set, assistant will use keyword replies only");
                None
            }
        };

        let user_service = Arc::new(UserService::new(store.clone(), notification_service.clone()));
        let driver_service = Arc::new(DriverService::new(store.clone(), notification_service.clone()));
        let ride_service = Arc::new(RideService::new(
            store.clone(),
            notification_service.clone(),
            timings,
            config.auto_dispatch,
        ));
        let pricing_service = Arc::new(PricingService::new(store.clone()));
        let wallet_service = Arc::new(WalletService::new(store.clone(), notification_service.clone()));
        let logistics_service = Arc::new(LogisticsService::new(store.clone(), notification_service.clone()));
        let fraud_service = Arc::new(FraudService::new(store.clone(), notification_service.clone()));
        let ai_service = Arc::new(AiService::new(generator));
        let admin_service = Arc::new(AdminService::new(store.clone()));
        let scheduler = Arc::new(SchedulerService::new(
            wallet_service.clone(),
            ride_service.clone(),
            fraud_service.clone(),
        ));

        Self {
            store,
            user_service,
            driver_service,
            ride_service,
            pricing_service,
            wallet_service,
            logistics_service,
            fraud_service,
            ai_service,
            admin_service,
            scheduler,
            notification_service,
            config,
        }
    }
}
