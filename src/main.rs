use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keke_napepe::{
    config::AppConfig,
    handlers,
    services::seed_service::seed_demo_data,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keke_napepe=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let seed = config.seed_demo_data;
    let start_scheduler = config.start_scheduler;

    let app_state = Arc::new(AppState::new(config));

    if seed {
        let summary = seed_demo_data(&app_state.store).await?;
        tracing::info!("Demo data ready: {} users, {} drivers", summary.users, summary.drivers);
    }
    if start_scheduler {
        app_state.scheduler.start().await;
    }

    let app = handlers::router(app_state.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Keke Napepe backend listening on {}", bind_addr);
    axum::serve(listener, app).await?;

    app_state.scheduler.stop().await;
    Ok(())
}
