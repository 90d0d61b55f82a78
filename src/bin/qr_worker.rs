// QR worker: renders redemption QR codes for sent messages into the blob
// bucket.

use tracing::info;

use promorelay_core::handlers::status;
use promorelay_core::queue::names;
use promorelay_core::services::background_tasks::spawn_housekeeping;
use promorelay_core::services::qr_worker::run_qr_job;
use promorelay_core::{init_tracing, initialize_app_state, WorkerManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let state = initialize_app_state().await?;
    spawn_housekeeping(state.clone(), "qr-worker");

    let mut manager = WorkerManager::new(state.clone(), state.config.qr_concurrency, &[names::QR]);
    manager.register(names::QR, run_qr_job);

    let bind_address = state.config.bind_address.clone();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("qr worker status server listening on {}", bind_address);
    let server = tokio::spawn(async move { axum::serve(listener, status::router(state)).await });

    manager.run().await?;
    server.abort();
    Ok(())
}
