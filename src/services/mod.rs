// src/services/mod.rs
pub mod admin_service;
pub mod ai_service;
pub mod driver_service;
pub mod fraud_service;
pub mod logistics_service;
pub mod messaging_service;
pub mod pricing_service;
pub mod ride_service;
pub mod scheduler_service;
pub mod seed_service;
pub mod store_service;
pub mod user_service;
pub mod wallet_service;
