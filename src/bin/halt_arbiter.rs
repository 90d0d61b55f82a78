// Halt arbiter: a small stateless lookup service over the shared halt
// directive store. Workers POST their tags to /checkhalt.

use tracing::info;

use promorelay_core::handlers::halt::{routes, HaltState};
use promorelay_core::services::HaltService;
use promorelay_core::{app_config, init_tracing, RedisConfig, RedisPool};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    dotenv::dotenv().ok();
    let config = app_config::config();

    let redis_pool = RedisPool::new(RedisConfig::from_env()).await?;
    let state = HaltState {
        halt: HaltService::new(redis_pool.clone()),
        redis_pool,
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("halt arbiter listening on {}", config.bind_address);
    axum::serve(listener, routes(state)).await?;
    Ok(())
}
