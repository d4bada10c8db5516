//! OpenMart Marketplace - service entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use openmart_marketplace::config::Config;
use openmart_marketplace::notify::{NatsNotifier, NoopNotifier, Notifier};
use openmart_marketplace::routes::api_router;
use openmart_marketplace::scheduler::DiscountScheduler;
use openmart_marketplace::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let notifier: Arc<dyn Notifier> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsNotifier::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, notifications disabled");
                Arc::new(NoopNotifier)
            }
        },
        None => Arc::new(NoopNotifier),
    };

    let scheduler = DiscountScheduler::new(Duration::from_secs(config.discount_tick_secs));
    scheduler.ensure_running(&db);

    let state = AppState { db, notifier, scheduler };
    let app = api_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("OpenMart marketplace listening on 0.0.0.0:{}", config.port);
    axum::serve(listener, app).await?;
    Ok(())
}
