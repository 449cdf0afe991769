//! JSON-over-HTTP [`Publisher`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{ExternalError, Publisher};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpPublisherConfig {
    pub endpoint: String,
    pub token: Option<String>,
    /// Returned when the service does not report a post URL of its own.
    pub profile_link: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    #[serde(default)]
    url: Option<String>,
}

/// POSTs `{"text": ...}` to the configured endpoint.
#[derive(Clone)]
pub struct HttpPublisher {
    http: reqwest::Client,
    config: HttpPublisherConfig,
}

impl HttpPublisher {
    pub fn new(config: HttpPublisherConfig) -> Result<Self, ExternalError> {
        let http = reqwest::Client::builder()
            .user_agent("ichiryu-publisher")
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(|error| ExternalError::Request(error.to_string()))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, text: &str) -> Result<String, ExternalError> {
        let mut request = self
            .http
            .post(&self.config.endpoint)
            .json(&json!({ "text": text }));
        if let Some(token) = self.config.token.as_deref().filter(|token| !token.is_empty()) {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|error| ExternalError::Request(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExternalError::Status(status.as_u16()));
        }

        let body = response.text().await.unwrap_or_default();
        let url = serde_json::from_str::<PublishResponse>(&body)
            .ok()
            .and_then(|parsed| parsed.url)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.config.profile_link.clone());
        Ok(url)
    }
}
