//! Canned-response transport for tests and offline runs.
//!
//! Routes are matched by URL substring in registration order; the first match
//! wins. Every request is recorded so callers can count live fetches.

use super::provider::{FetchError, JsonTransport};
use std::sync::Mutex;

/// What a stub route answers with.
#[derive(Debug, Clone)]
pub enum StubReply {
    Json(serde_json::Value),
    TransportFailure(String),
    Status(u16),
}

/// Transport that never touches the network.
#[derive(Debug, Default)]
pub struct StubTransport {
    routes: Vec<(String, StubReply)>,
    requests: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests whose URL contains `fragment` with `body`.
    pub fn with_json(mut self, fragment: &str, body: serde_json::Value) -> Self {
        self.routes.push((fragment.to_string(), StubReply::Json(body)));
        self
    }

    /// Answer requests whose URL contains `fragment` with a transport failure.
    pub fn with_failure(mut self, fragment: &str, reason: &str) -> Self {
        self.routes
            .push((fragment.to_string(), StubReply::TransportFailure(reason.to_string())));
        self
    }

    /// Answer requests whose URL contains `fragment` with an HTTP status.
    pub fn with_status(mut self, fragment: &str, status: u16) -> Self {
        self.routes.push((fragment.to_string(), StubReply::Status(status)));
        self
    }

    /// All URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of requests whose URL contains `fragment`.
    pub fn calls_matching(&self, fragment: &str) -> usize {
        self.requests()
            .iter()
            .filter(|url| url.contains(fragment))
            .count()
    }
}

impl JsonTransport for StubTransport {
    fn name(&self) -> &str {
        "stub"
    }

    fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }

        let reply = self
            .routes
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(StubReply::Json(body)) => Ok(body),
            Some(StubReply::TransportFailure(reason)) => Err(FetchError::Transport(reason)),
            Some(StubReply::Status(status)) => Err(FetchError::HttpStatus {
                status,
                url: url.to_string(),
            }),
            None => Err(FetchError::Transport(format!("no stub route for {url}"))),
        }
    }
}
