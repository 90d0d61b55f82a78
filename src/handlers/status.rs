// Shared /status surface: broker and database health as plain text.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::app::AppState;
use crate::db::check_diesel_health;
use crate::queue::names;

pub fn router(state: AppState) -> Router {
    Router::new().route("/status", get(status)).with_state(state)
}

pub async fn status(State(state): State<AppState>) -> Response {
    let redis = state.redis_pool.health_check().await;
    let database = match check_diesel_health(&state.diesel_pool).await {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let mut lines = vec![
        format!("database: {}", database),
        format!(
            "broker: {} ({} ms)",
            if redis.is_healthy { "ok" } else { "unhealthy" },
            redis.latency_ms
        ),
    ];

    for queue in [names::CRITICAL, names::SEND, names::QR, names::SNAPSHOT] {
        match state.broker.queue_len(queue).await {
            Ok(len) => lines.push(format!("queue {}: {} waiting", queue, len)),
            Err(e) => lines.push(format!("queue {}: error {}", queue, e)),
        }
    }
    match state.broker.dead_len().await {
        Ok(len) => lines.push(format!("dead jobs: {}", len)),
        Err(e) => lines.push(format!("dead jobs: error {}", e)),
    }

    let healthy = redis.is_healthy && database == "ok";
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (code, lines.join("\n")).into_response()
}
