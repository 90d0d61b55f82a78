// Redis connection management. Redis backs two concerns here: the halt
// directive store (keyed existence checks) and the job broker.

use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info};

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub redis_url: String,
    pub pool_size: u32,
}

impl RedisConfig {
    pub fn from_env() -> Self {
        let config = crate::app_config::config();
        Self {
            redis_url: config.redis_url.clone(),
            pool_size: config.redis_pool_size,
        }
    }
}

/// Health check status for Redis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisHealth {
    pub is_healthy: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// Thin wrapper around a multiplexed connection manager. Cloning is cheap;
/// every clone shares the underlying connection with automatic reconnect.
#[derive(Clone)]
pub struct RedisPool {
    manager: ConnectionManager,
}

impl RedisPool {
    pub async fn new(config: RedisConfig) -> Result<Self, RedisError> {
        info!("Connecting to Redis at {}", mask_redis_url(&config.redis_url));
        let client = Client::open(config.redis_url.as_str())?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }

    /// A fresh handle for command pipelines owned by the caller
    pub fn manager(&self) -> ConnectionManager {
        self.manager.clone()
    }

    /// EXISTS: the halt store's primitive
    pub async fn key_exists(&self, key: &str) -> Result<bool, RedisError> {
        let mut conn = self.manager();
        conn.exists(key).await
    }

    /// INFO stats passthrough for the /status endpoints
    pub async fn info_stats(&self) -> Result<String, RedisError> {
        let mut conn = self.manager();
        redis::cmd("INFO").arg("stats").query_async(&mut conn).await
    }

    pub async fn health_check(&self) -> RedisHealth {
        let start = Instant::now();
        let mut conn = self.manager();
        let result: Result<String, RedisError> =
            redis::cmd("PING").query_async(&mut conn).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => RedisHealth {
                is_healthy: true,
                latency_ms,
                error: None,
            },
            Err(e) => {
                error!("Redis health check failed: {}", e);
                RedisHealth {
                    is_healthy: false,
                    latency_ms,
                    error: Some(e.to_string()),
                }
            },
        }
    }
}

/// Mask credentials in a Redis URL for logging
pub fn mask_redis_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        },
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_url_masking() {
        assert_eq!(
            mask_redis_url("redis://:pw@redis.host:6379"),
            "redis://***@redis.host:6379"
        );
        assert_eq!(mask_redis_url("redis://localhost:6379"), "redis://localhost:6379");
    }
}
