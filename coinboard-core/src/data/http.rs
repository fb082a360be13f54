//! reqwest-backed transport.
//!
//! One blocking GET per call. No retries and no timeout beyond reqwest's
//! default unless the configuration sets one.

use super::provider::{redact_api_key, FetchError, JsonTransport};
use crate::config::HttpConfig;
use std::time::Duration;

/// HTTP transport used against the live sources.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::blocking::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl JsonTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let display_url = redact_api_key(url);
        tracing::debug!(transport = self.name(), url = %display_url, "GET");

        let resp = self
            .client
            .get(url)
            .send()
            // reqwest errors embed the URL, which may carry the API key
            .map_err(|e| FetchError::Transport(redact_api_key(&e.to_string())))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: display_url,
            });
        }

        resp.json::<serde_json::Value>()
            .map_err(|e| FetchError::Malformed(format!("body is not JSON: {e}")))
    }
}
