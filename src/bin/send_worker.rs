// Send worker: consumes send jobs and fires each chunk's SMS messages,
// wrapped by a small web server exposing /status.

use tracing::info;

use promorelay_core::handlers::status;
use promorelay_core::queue::names;
use promorelay_core::services::background_tasks::spawn_housekeeping;
use promorelay_core::services::send_worker::run_send_job;
use promorelay_core::{init_tracing, initialize_app_state, WorkerManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let state = initialize_app_state().await?;
    spawn_housekeeping(state.clone(), "send-worker");

    // critical first: the broker drains queues in strict priority order
    let mut manager = WorkerManager::new(
        state.clone(),
        state.config.send_concurrency,
        &[names::CRITICAL, names::SEND],
    );
    manager.register(names::SEND, run_send_job);

    let bind_address = state.config.bind_address.clone();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("send worker status server listening on {}", bind_address);
    let server = tokio::spawn(async move { axum::serve(listener, status::router(state)).await });

    manager.run().await?;
    server.abort();
    Ok(())
}
