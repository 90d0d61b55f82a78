// Enqueuer HTTP surface: /enqueuejob starts a broadcast, /queueqrgen
// pushes an ad hoc QR job.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, info};
use validator::Validate;

use crate::app::AppState;
use crate::handlers::status;
use crate::services::enqueue::{EnqueueError, EnqueueService};

#[derive(Debug, Deserialize, Validate)]
pub struct EnqueueJobRequest {
    #[validate(length(min = 1, message = "missing docid parameter"))]
    pub docid: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QrGenRequest {
    #[validate(length(min = 1, message = "missing shortcode parameter"))]
    pub shortcode: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/enqueuejob", post(enqueue_job))
        .route("/queueqrgen", post(queue_qr_gen))
        .route("/status", get(status::status))
        .with_state(state)
}

fn error_response(e: EnqueueError) -> Response {
    let code = if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (code, Json(e.to_string())).into_response()
}

async fn enqueue_job(
    State(state): State<AppState>,
    Json(request): Json<EnqueueJobRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return (StatusCode::BAD_REQUEST, Json(e.to_string())).into_response();
    }

    info!(docid = %request.docid, "handling an inbound enqueue request");

    match EnqueueService::new(state).enqueue_broadcast(&request.docid).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(format!(
                "successfully enqueued {} jobs sending {} messages",
                summary.jobs, summary.messages
            )),
        )
            .into_response(),
        Err(e) => {
            error!(docid = %request.docid, "enqueue failed: {}", e);
            error_response(e)
        },
    }
}

async fn queue_qr_gen(
    State(state): State<AppState>,
    Json(request): Json<QrGenRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return (StatusCode::BAD_REQUEST, Json(e.to_string())).into_response();
    }

    info!(shortcode = %request.shortcode, "handling an inbound ad hoc QR request");

    match EnqueueService::new(state)
        .enqueue_adhoc_qr(&request.shortcode)
        .await
    {
        Ok(jid) => (
            StatusCode::OK,
            Json(format!("successfully enqueued job: {}", jid)),
        )
            .into_response(),
        Err(e) => {
            error!(shortcode = %request.shortcode, "ad hoc QR enqueue failed: {}", e);
            error_response(e)
        },
    }
}
