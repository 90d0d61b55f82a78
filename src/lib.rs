// Library exports for the promorelay broadcast pipeline.
// Five service binaries under src/bin/ share this crate.

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod queue;
pub mod schema;
pub mod services;
pub mod utils;

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use app::AppState;
pub use app_config::{AppConfig, Environment, CONFIG};
pub use db::{DieselPool, RedisConfig, RedisPool};
pub use queue::{Broker, Job, JobContext, WorkerManager};
pub use services::{
    AnalyticsSink, EnqueueService, EventNotifier, HaltClient, HaltService, ShortLinkService,
    SmsProviderClient,
};

/// Install the tracing subscriber for a service binary
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "promorelay_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Assemble the full service context: config, pools, broker, and the
/// outbound clients. Called once from each binary's main.
pub async fn initialize_app_state() -> Result<AppState, Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let config = app_config::config();

    info!(
        "Initializing database pool at {}...",
        db::mask_connection_string(&config.database_url)
    );
    let diesel_pool = db::create_diesel_pool(db::DieselDatabaseConfig::default()).await?;

    info!("Initializing Redis pool...");
    let redis_pool = RedisPool::new(RedisConfig::from_env()).await?;

    let broker = Broker::new(redis_pool.clone());
    let provider = SmsProviderClient::new(config);
    let halt_client = HaltClient::new(&config.halt_check_url, &config.environment.to_string());
    let notifier = EventNotifier::new(&config.skip_stop_event_url);
    let analytics = AnalyticsSink::new(config, config.environment);
    let config = Arc::new(config.clone());
    let short_links = ShortLinkService::new(diesel_pool.clone(), config.clone());

    Ok(AppState {
        config,
        diesel_pool,
        redis_pool,
        broker,
        provider,
        halt_client,
        notifier,
        analytics,
        short_links,
    })
}
