// Periodic housekeeping shared by every service binary: a database
// session refresh every four hours and a heartbeat log line so operators
// can see the process is alive between jobs.

use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

use crate::app::AppState;
use crate::db::check_diesel_health;

const DB_REFRESH_SECS: u64 = 4 * 60 * 60;
const HEARTBEAT_LOG_SECS: u64 = 30 * 60;

pub fn spawn_housekeeping(state: AppState, service_name: &'static str) {
    let pool = state.diesel_pool.clone();
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(DB_REFRESH_SECS));
        loop {
            tick.tick().await;
            match check_diesel_health(&pool).await {
                Ok(()) => info!("refreshed the database session"),
                Err(e) => error!("database session refresh failed: {}", e),
            }
        }
    });

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(HEARTBEAT_LOG_SECS));
        loop {
            tick.tick().await;
            info!("HEARTBEAT - the {} service is up and running", service_name);
        }
    });
}
