// Outbound event plumbing: skip-stop notifications back to the upstream
// app, and the Keen-style analytics sink fed by the snapshot worker.

use chrono::{SecondsFormat, Utc};
use chrono_tz::America::Los_Angeles;
use serde_json::json;
use tracing::error;

use crate::app_config::{AppConfig, Environment};

/// Event name logged when a stop-listed phone is skipped
pub const EVENT_SKIP_STOP_PHONE: &str = "provider_skip_stop_phone_number";

// =============================================================================
// SKIP-STOP NOTIFIER
// =============================================================================

#[derive(Clone)]
pub struct EventNotifier {
    http: reqwest::Client,
    url: String,
}

impl EventNotifier {
    pub fn new(url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
        }
    }

    /// Tell the upstream app a stop-listed number was skipped. Fired in the
    /// background so the send loop never waits on it; failures only log.
    pub fn notify_skip_stop(&self, phone: &str) {
        let http = self.http.clone();
        let url = self.url.clone();
        let payload = json!({
            "data": {"docid": "", "usertype": "", "username": ""},
            "event": {
                "event": EVENT_SKIP_STOP_PHONE,
                "phone": phone,
                "timestamp": Utc::now()
                    .with_timezone(&Los_Angeles)
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            },
        });

        tokio::spawn(async move {
            if let Err(e) = http.post(&url).json(&payload).send().await {
                error!("error transmitting a skip-stop event to {}: {}", url, e);
            }
        });
    }
}

// =============================================================================
// ANALYTICS SINK
// =============================================================================

#[derive(Clone)]
pub struct AnalyticsSink {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    write_key: String,
}

impl AnalyticsSink {
    /// Production writes to its own analytics project; every other
    /// environment shares the non-prod one.
    pub fn new(config: &AppConfig, env: Environment) -> Self {
        let (project_id, write_key) = config.analytics_credentials(env);
        Self {
            http: reqwest::Client::new(),
            base_url: config.analytics_base_url.clone(),
            project_id: project_id.to_string(),
            write_key: write_key.to_string(),
        }
    }

    pub fn event_url(&self, collection: &str) -> String {
        format!(
            "{}/3.0/projects/{}/events/{}?api_key={}",
            self.base_url, self.project_id, collection, self.write_key
        )
    }

    pub async fn record(
        &self,
        collection: &str,
        event: &serde_json::Value,
    ) -> Result<(), reqwest::Error> {
        self.http
            .post(self.event_url(collection))
            .json(event)
            .send()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_url_carries_project_collection_and_key() {
        let sink = AnalyticsSink {
            http: reqwest::Client::new(),
            base_url: "https://api.keen.io".to_string(),
            project_id: "proj1".to_string(),
            write_key: "key1".to_string(),
        };
        assert_eq!(
            sink.event_url("smsmessages"),
            "https://api.keen.io/3.0/projects/proj1/events/smsmessages?api_key=key1"
        );
    }
}
