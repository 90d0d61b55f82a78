// Enqueuer: receives broadcast requests over HTTP and turns them into
// chains of delayed send jobs.

use tracing::info;

use promorelay_core::handlers::enqueue::routes;
use promorelay_core::services::background_tasks::spawn_housekeeping;
use promorelay_core::{init_tracing, initialize_app_state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let state = initialize_app_state().await?;
    spawn_housekeeping(state.clone(), "enqueuer");

    let bind_address = state.config.bind_address.clone();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("enqueuer listening on {}", bind_address);
    axum::serve(listener, routes(state)).await?;
    Ok(())
}
