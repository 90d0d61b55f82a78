// Halt arbiter HTTP surface. /checkhalt reads the raw body so the error
// contract stays exact: empty array is a 400, a parse failure is a 500.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{error, info};

use crate::db::RedisPool;
use crate::services::halt::HaltService;

#[derive(Clone)]
pub struct HaltState {
    pub redis_pool: RedisPool,
    pub halt: HaltService,
}

pub fn routes(state: HaltState) -> Router {
    Router::new()
        .route("/checkhalt", post(check_halt))
        .route("/status", get(status))
        .with_state(state)
}

async fn check_halt(State(state): State<HaltState>, body: Bytes) -> Response {
    let tags: Vec<String> = match serde_json::from_slice(&body) {
        Ok(tags) => tags,
        Err(e) => {
            error!("error parsing the inbound json request data: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "halt": false,
                    "msg": "error parsing the inbound json request data",
                })),
            )
                .into_response();
        },
    };

    if tags.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "halt": false,
                "msg": "no inbound directives (array of strings) found - nothing to do",
            })),
        )
            .into_response();
    }

    let decision = state.halt.is_halted(&tags).await;
    info!(
        halt = decision.halt,
        "returning to the halt check caller: {}", decision.msg
    );

    (
        StatusCode::OK,
        Json(json!({"halt": decision.halt, "msg": decision.msg})),
    )
        .into_response()
}

async fn status(State(state): State<HaltState>) -> Response {
    match state.redis_pool.info_stats().await {
        Ok(stats) => (StatusCode::OK, stats).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("error reading halt store stats: {}", e),
        )
            .into_response(),
    }
}
