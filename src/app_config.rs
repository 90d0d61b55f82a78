// Centralized configuration for the broadcast pipeline services.
// All environment variables are read ONCE at startup; job and handler code
// only ever sees the typed AppConfig.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

use crate::utils::validation::ensure_trailing_slash;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Global application configuration loaded once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    dotenv::dotenv().ok();
    AppConfig::from_env().expect("Failed to load configuration")
});

pub fn config() -> &'static AppConfig {
    &CONFIG
}

/// Environment type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl From<&str> for Environment {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // Server
    pub bind_address: String,
    pub environment: Environment,

    // Postgres
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_min_connections: u32,
    pub database_connect_timeout: u64,

    // Redis (halt directives + job broker)
    pub redis_url: String,
    pub redis_pool_size: u32,

    // SMS provider
    pub provider_account_sid: String,
    pub provider_auth_token: String,
    pub provider_from_number: String,
    pub stub_provider: bool,
    pub stub_provider_url: String,

    // Send pipeline knobs
    pub chunk_threshold: usize,
    pub send_threshold: usize,
    pub send_delay_secs: u64,
    pub halt_interval: usize,
    pub progress_interval: usize,
    pub job_timeout_secs: u64,
    pub enqueue_delay_secs: i64,
    pub stop_list_cache_max: usize,

    // Worker pools
    pub send_concurrency: usize,
    pub qr_concurrency: usize,
    pub snapshot_concurrency: usize,

    // Call-hour gate (Pacific time)
    pub enforce_call_hours: bool,
    pub call_start_hour: u32,
    pub call_end_hour: u32,
    pub internal_test_flag: String,

    // Short links and QR redemption, per environment
    pub shortlink_base_dev: String,
    pub shortlink_base_stg: String,
    pub shortlink_base_prod: String,
    pub redeem_base_dev: String,
    pub redeem_base_stg: String,
    pub redeem_base_prod: String,

    // External collaborators
    pub halt_check_url: String,
    pub skip_stop_event_url: String,
    pub analytics_base_url: String,
    pub analytics_project_prod: String,
    pub analytics_key_prod: String,
    pub analytics_project_nonprod: String,
    pub analytics_key_nonprod: String,
}

impl AppConfig {
    /// Load configuration from environment variables (prefix `BVAPP_`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let get_or_default = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let parse_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid integer".to_string())
            })
        };

        let parse_bool_or_default =
            |key: &str, default: &str| get_or_default(key, default).to_lowercase() == "true";

        let environment = Environment::from(get_or_default("BVAPP_ENVIRONMENT", "development").as_str());

        let call_start_hour = parse_or_default("BVAPP_CALL_START_HOUR", "8")? as u32;
        let call_end_hour = parse_or_default("BVAPP_CALL_END_HOUR", "20")? as u32;
        if call_start_hour > 23 || call_end_hour > 24 {
            return Err(ConfigError::InvalidValue(
                "BVAPP_CALL_START_HOUR/BVAPP_CALL_END_HOUR".to_string(),
                "hours must fall within a 24 hour day".to_string(),
            ));
        }

        Ok(Self {
            bind_address: get_or_default("BIND_ADDRESS", "0.0.0.0:8080"),
            environment,

            database_url: get_or_default("DATABASE_URL", "postgresql://localhost:5432/promorelay"),
            database_max_connections: parse_or_default("DATABASE_MAX_CONNECTIONS", "20")? as u32,
            database_min_connections: parse_or_default("DATABASE_MIN_CONNECTIONS", "2")? as u32,
            database_connect_timeout: parse_or_default("DATABASE_CONNECT_TIMEOUT", "30")?,

            redis_url: get_or_default("REDIS_URL", "redis://localhost:6379"),
            redis_pool_size: parse_or_default("REDIS_POOL_SIZE", "10")? as u32,

            provider_account_sid: get_or_default("BVAPP_PROVIDER_ACCOUNT_SID", ""),
            provider_auth_token: get_or_default("BVAPP_PROVIDER_AUTH_TOKEN", ""),
            provider_from_number: get_or_default("BVAPP_PROVIDER_FROM_NUMBER", ""),
            stub_provider: parse_bool_or_default("BVAPP_STUB_PROVIDER", "false"),
            stub_provider_url: get_or_default(
                "BVAPP_STUB_PROVIDER_URL",
                "http://localhost:4010/stubprovider",
            ),

            chunk_threshold: parse_or_default("BVAPP_CHUNK_THRESHOLD", "500")? as usize,
            send_threshold: parse_or_default("BVAPP_SEND_THRESHOLD", "2000")? as usize,
            send_delay_secs: parse_or_default("BVAPP_SEND_DELAY_SECS", "1")?,
            halt_interval: parse_or_default("BVAPP_HALT_INTERVAL", "20")? as usize,
            progress_interval: parse_or_default("BVAPP_PROGRESS_INTERVAL", "100")? as usize,
            job_timeout_secs: parse_or_default("BVAPP_JOB_TIMEOUT_SECS", "7200")?,
            enqueue_delay_secs: parse_or_default("BVAPP_ENQUEUE_DELAY_SECS", "1800")? as i64,
            stop_list_cache_max: parse_or_default("BVAPP_STOP_LIST_CACHE_MAX", "250000")? as usize,

            send_concurrency: parse_or_default("BVAPP_SEND_CONCURRENCY", "5")? as usize,
            qr_concurrency: parse_or_default("BVAPP_QR_CONCURRENCY", "3")? as usize,
            snapshot_concurrency: parse_or_default("BVAPP_SNAPSHOT_CONCURRENCY", "3")? as usize,

            enforce_call_hours: parse_bool_or_default("BVAPP_ENFORCE_CALL_HOURS", "false"),
            call_start_hour,
            call_end_hour,
            internal_test_flag: get_or_default("BVAPP_INTERNAL_TEST_FLAG", "96JCAKZ7(7DN"),

            shortlink_base_dev: ensure_trailing_slash(&get_or_default(
                "BVAPP_SHORTLINK_BASE_DEV",
                "http://localhost:8080/x",
            )),
            shortlink_base_stg: ensure_trailing_slash(&get_or_default(
                "BVAPP_SHORTLINK_BASE_STG",
                "http://staging.prly.io/x",
            )),
            shortlink_base_prod: ensure_trailing_slash(&get_or_default(
                "BVAPP_SHORTLINK_BASE_PROD",
                "http://prly.io/x",
            )),
            redeem_base_dev: ensure_trailing_slash(&get_or_default(
                "BVAPP_REDEEM_BASE_DEV",
                "http://localhost:8080/redeematpos",
            )),
            redeem_base_stg: ensure_trailing_slash(&get_or_default(
                "BVAPP_REDEEM_BASE_STG",
                "http://staging.promorelay.com/redeematpos",
            )),
            redeem_base_prod: ensure_trailing_slash(&get_or_default(
                "BVAPP_REDEEM_BASE_PROD",
                "https://app.promorelay.com/redeematpos",
            )),

            halt_check_url: get_or_default(
                "BVAPP_HALT_CHECK_URL",
                "http://localhost:8081/checkhalt",
            ),
            skip_stop_event_url: get_or_default(
                "BVAPP_SKIP_STOP_EVENT_URL",
                "http://localhost:8082/clientevent",
            ),
            analytics_base_url: get_or_default("BVAPP_ANALYTICS_BASE_URL", "https://api.keen.io"),
            analytics_project_prod: get_or_default("BVAPP_ANALYTICS_PROJECT_PROD", ""),
            analytics_key_prod: get_or_default("BVAPP_ANALYTICS_KEY_PROD", ""),
            analytics_project_nonprod: get_or_default("BVAPP_ANALYTICS_PROJECT_NONPROD", ""),
            analytics_key_nonprod: get_or_default("BVAPP_ANALYTICS_KEY_NONPROD", ""),
        })
    }

    /// Short-link base URL for an environment; always ends with `/`
    pub fn shortlink_base(&self, env: Environment) -> &str {
        match env {
            Environment::Development => &self.shortlink_base_dev,
            Environment::Staging => &self.shortlink_base_stg,
            Environment::Production => &self.shortlink_base_prod,
        }
    }

    /// QR redemption base URL for an environment; always ends with `/`
    pub fn redeem_base(&self, env: Environment) -> &str {
        match env {
            Environment::Development => &self.redeem_base_dev,
            Environment::Staging => &self.redeem_base_stg,
            Environment::Production => &self.redeem_base_prod,
        }
    }

    /// Analytics sink project id and write key; production gets its own project
    pub fn analytics_credentials(&self, env: Environment) -> (&str, &str) {
        if env == Environment::Production {
            (&self.analytics_project_prod, &self.analytics_key_prod)
        } else {
            (&self.analytics_project_nonprod, &self.analytics_key_nonprod)
        }
    }

    /// The provider messages endpoint for the configured account
    pub fn provider_message_url(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.provider_account_sid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_aliases() {
        assert_eq!(Environment::from("prod"), Environment::Production);
        assert_eq!(Environment::from("Staging"), Environment::Staging);
        assert_eq!(Environment::from("dev"), Environment::Development);
        assert_eq!(Environment::from("anything-else"), Environment::Development);
    }

    #[test]
    fn environment_display_round_trips() {
        for env in [
            Environment::Development,
            Environment::Staging,
            Environment::Production,
        ] {
            assert_eq!(Environment::from(env.to_string().as_str()), env);
        }
    }
}
