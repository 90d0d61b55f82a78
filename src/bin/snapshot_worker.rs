// Snapshot worker: writes denormalized analytics events for each sent
// message.

use tracing::info;

use promorelay_core::handlers::status;
use promorelay_core::queue::names;
use promorelay_core::services::background_tasks::spawn_housekeeping;
use promorelay_core::services::snapshot_worker::run_snapshot_job;
use promorelay_core::{init_tracing, initialize_app_state, WorkerManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let state = initialize_app_state().await?;
    spawn_housekeeping(state.clone(), "snapshot-worker");

    let mut manager = WorkerManager::new(
        state.clone(),
        state.config.snapshot_concurrency,
        &[names::SNAPSHOT],
    );
    manager.register(names::SNAPSHOT, run_snapshot_job);

    let bind_address = state.config.bind_address.clone();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("snapshot worker status server listening on {}", bind_address);
    let server = tokio::spawn(async move { axum::serve(listener, status::router(state)).await });

    manager.run().await?;
    server.abort();
    Ok(())
}
