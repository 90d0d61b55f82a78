// Halt arbitration. The store side answers existence checks against Redis;
// the client side is what workers poll from inside their loops. Both fail
// open: a sick halt store must not stall the fleet.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use crate::db::RedisPool;

/// The global directive key: when present, every job in every environment
/// stops.
pub const DIRECTIVE_ALL: &str = "all";

/// Halt checks sit inside send loops; keep the client snappy.
const HALT_CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HaltDecision {
    pub halt: bool,
    pub msg: String,
}

// =============================================================================
// STORE SIDE (halt arbiter service)
// =============================================================================

#[derive(Clone)]
pub struct HaltService {
    redis: RedisPool,
}

impl HaltService {
    pub fn new(redis: RedisPool) -> Self {
        Self { redis }
    }

    /// Decide whether a job matching any of `tags` should stop. The `all`
    /// directive is checked first; afterwards the first existing tag wins.
    pub async fn is_halted(&self, tags: &[String]) -> HaltDecision {
        match self.redis.key_exists(DIRECTIVE_ALL).await {
            Ok(true) => {
                return HaltDecision {
                    halt: true,
                    msg: "all directive - halt all jobs".to_string(),
                }
            },
            Ok(false) => {},
            Err(e) => {
                error!("error checking the halt store for the 'all' directive: {}", e);
                return HaltDecision {
                    halt: false,
                    msg: "an error occurred".to_string(),
                };
            },
        }

        for tag in tags {
            match self.redis.key_exists(tag).await {
                Ok(true) => {
                    info!("found halt directive: {}", tag);
                    return HaltDecision {
                        halt: true,
                        msg: format!("halt job - {} directive has been found", tag),
                    };
                },
                Ok(false) => {},
                Err(e) => {
                    error!("error checking the halt store for the {} directive: {}", tag, e);
                },
            }
        }

        HaltDecision {
            halt: false,
            msg: "no halt directive(s) found".to_string(),
        }
    }
}

// =============================================================================
// CLIENT SIDE (polled by workers)
// =============================================================================

#[derive(Clone)]
pub struct HaltClient {
    http: reqwest::Client,
    url: String,
    environment: String,
}

impl HaltClient {
    pub fn new(url: &str, environment: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HALT_CLIENT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            url: url.to_string(),
            environment: environment.to_string(),
        }
    }

    /// Ask the halt arbiter whether the current job should stop. The
    /// environment tag is always sent first. Any transport or decoding
    /// failure reads as "keep going".
    pub async fn should_halt(&self, tags: &[&str]) -> bool {
        let mut payload = Vec::with_capacity(tags.len() + 1);
        payload.push(self.environment.as_str());
        payload.extend_from_slice(tags);

        let response = match self.http.post(&self.url).json(&payload).send().await {
            Ok(r) => r,
            Err(e) => {
                error!("error calling the halt check service: {}", e);
                return false;
            },
        };

        let decision: HaltDecision = match response.json().await {
            Ok(d) => d,
            Err(e) => {
                error!("error decoding the halt check response: {}", e);
                return false;
            },
        };

        if decision.halt {
            info!("current running job should be halted: {}", decision.msg);
        }
        decision.halt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_wire_format_matches_the_contract() {
        let decision = HaltDecision {
            halt: true,
            msg: "all directive - halt all jobs".to_string(),
        };
        let v = serde_json::to_value(&decision).unwrap();
        assert_eq!(v["halt"], true);
        assert_eq!(v["msg"], "all directive - halt all jobs");

        let parsed: HaltDecision =
            serde_json::from_str(r#"{"halt":false,"msg":"no halt directive(s) found"}"#).unwrap();
        assert!(!parsed.halt);
    }
}
