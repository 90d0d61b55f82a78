// SMS provider client. The wire contract is a URL-encoded form POST with
// From/To/Body and an optional MediaUrl; whatever status the provider
// returns is persisted verbatim. A stub endpoint can stand in for the real
// API so staging never sends live texts.

use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::app_config::AppConfig;
use crate::utils::phone::PROVIDER_FORMAT;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Error, Debug)]
pub enum ProviderError {
    /// The POST itself failed; no response was received
    #[error("provider request failed: {0}")]
    Request(reqwest::Error),
    /// A response arrived but its body could not be read
    #[error("provider response body read failed: {0}")]
    BodyRead(reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct ProviderCallParams {
    pub from: String,
    pub to: String,
    pub body: String,
    pub media_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub status_msg: String,
    pub body: String,
}

#[derive(Clone)]
pub struct SmsProviderClient {
    http: reqwest::Client,
    endpoint: String,
    account_sid: String,
    auth_token: String,
    default_from: String,
    stubbed: bool,
}

impl SmsProviderClient {
    pub fn new(config: &AppConfig) -> Self {
        let endpoint = if config.stub_provider {
            info!(
                "stubbing provider API calls to a test server: {}",
                config.stub_provider_url
            );
            config.stub_provider_url.clone()
        } else {
            config.provider_message_url()
        };

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            endpoint,
            account_sid: config.provider_account_sid.clone(),
            auth_token: config.provider_auth_token.clone(),
            default_from: config.provider_from_number.clone(),
            stubbed: config.stub_provider,
        }
    }

    pub fn is_stubbed(&self) -> bool {
        self.stubbed
    }

    /// The From number for a call: a broadcast-level override wins when it
    /// is already in provider format, otherwise the account default.
    pub fn resolve_from(&self, override_phone: Option<&str>) -> String {
        match override_phone {
            Some(p) if PROVIDER_FORMAT.is_match(p) => p.to_string(),
            _ => self.default_from.clone(),
        }
    }

    pub async fn send(&self, params: &ProviderCallParams) -> Result<ProviderResponse, ProviderError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("From", &params.from),
            ("To", &params.to),
            ("Body", &params.body),
        ];
        if let Some(media_url) = params.media_url.as_deref() {
            form.push(("MediaUrl", media_url));
        }

        let mut request = self.http.post(&self.endpoint).form(&form);
        if !self.stubbed {
            request = request.basic_auth(&self.account_sid, Some(&self.auth_token));
        }

        let response = request.send().await.map_err(ProviderError::Request)?;
        let status = response.status();
        let body = response.text().await.map_err(ProviderError::BodyRead)?;

        Ok(ProviderResponse {
            status: status.as_u16(),
            status_msg: status.to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_default(default_from: &str) -> SmsProviderClient {
        SmsProviderClient {
            http: reqwest::Client::new(),
            endpoint: "http://localhost:4010/stubprovider".to_string(),
            account_sid: String::new(),
            auth_token: String::new(),
            default_from: default_from.to_string(),
            stubbed: true,
        }
    }

    #[test]
    fn override_must_match_provider_format() {
        let client = client_with_default("+15550001111");
        assert_eq!(client.resolve_from(Some("+15559998888")), "+15559998888");
        // bare digits, short numbers, and garbage fall back to the default
        assert_eq!(client.resolve_from(Some("5559998888")), "+15550001111");
        assert_eq!(client.resolve_from(Some("+1555")), "+15550001111");
        assert_eq!(client.resolve_from(None), "+15550001111");
    }
}
