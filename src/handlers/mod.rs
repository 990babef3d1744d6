// src/handlers/mod.rs
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub mod admin_handler;
pub mod assistant_handler;
pub mod driver_handler;
pub mod health_handler;
pub mod order_handler;
pub mod ride_handler;
pub mod session_handler;
pub mod user_handler;

pub fn router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route(
            "/settings",
            get(admin_handler::get_settings).put(admin_handler::update_settings),
        )
        .route("/stats", get(admin_handler::get_stats))
        .route("/drivers/:id/status", put(admin_handler::update_driver_status))
        .route("/withdrawals", get(admin_handler::list_withdrawals))
        .route("/withdrawals/:id/process", post(admin_handler::process_withdrawal))
        .route("/fraud/alerts", get(admin_handler::list_alerts))
        .route("/fraud/alerts/:id/resolve", post(admin_handler::resolve_alert))
        .route("/fraud/scan", post(admin_handler::scan_fraud))
        .route("/fraud/assess", post(admin_handler::assess_user))
        .route("/jobs", get(admin_handler::list_jobs))
        .route("/jobs/:name", put(admin_handler::update_job))
        .route("/jobs/:name/run", post(admin_handler::run_job));

    Router::new()
        .route("/health", get(health_handler::health))
        .route("/sessions", post(session_handler::login))
        .route("/sessions/:token", get(session_handler::get_session))
        .route("/users", post(user_handler::create_user))
        .route("/users/:id", get(user_handler::get_user))
        .route("/users/:id/top-up", post(user_handler::top_up))
        .route("/users/:id/wallet", get(user_handler::get_wallet))
        .route("/users/:id/notifications", get(user_handler::get_notifications))
        .route("/users/:id/rides", get(user_handler::get_rides))
        .route("/users/:id/orders", get(user_handler::get_orders))
        .route(
            "/drivers",
            get(driver_handler::list_drivers).post(driver_handler::register_driver),
        )
        .route("/drivers/:id", get(driver_handler::get_driver))
        .route(
            "/drivers/:id/withdrawals",
            get(driver_handler::list_withdrawals).post(driver_handler::request_withdrawal),
        )
        .route("/rides", get(ride_handler::list_open_rides).post(ride_handler::book_ride))
        .route("/rides/estimate", post(ride_handler::estimate_ride))
        .route("/rides/:id", get(ride_handler::get_ride))
        .route("/rides/:id/cancel", post(ride_handler::cancel_ride))
        .route("/rides/:id/accept", post(ride_handler::accept_ride))
        .route("/rides/:id/arrived", post(ride_handler::mark_arrived))
        .route("/rides/:id/start", post(ride_handler::start_trip))
        .route("/rides/:id/complete", post(ride_handler::complete_trip))
        .route("/orders", post(order_handler::create_order))
        .route("/orders/:id", get(order_handler::get_order))
        .route("/orders/:id/advance", post(order_handler::advance_order))
        .route("/orders/:id/cancel", post(order_handler::cancel_order))
        .route("/track/:code", get(order_handler::track_order))
        .route("/assistant/chat", post(assistant_handler::chat))
        .route("/assistant/estimate", post(assistant_handler::estimate_trip))
        .nest("/admin", admin)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
