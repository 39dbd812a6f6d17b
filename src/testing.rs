// testing.rs - Scripted transport for unit tests

use crate::error::{Result, ScanError};
use crate::probe::{ProbeResult, Transport, Verb};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct MockResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    pub location: Option<String>,
    pub body: Vec<u8>,
    pub delay: Duration,
    pub fail: bool,
}

impl MockResponse {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub verb: Verb,
    pub timeout: Duration,
}

/// Answers from a table keyed by (verb, url). Unknown URLs get a 404, or a transport
/// error when built with `strict()`.
pub struct MockTransport {
    routes: Mutex<HashMap<(Verb, String), MockResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
    strict: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            strict: false,
        }
    }

    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::new()
        }
    }

    pub fn respond(&self, verb: Verb, url: &str, status: u16) {
        self.respond_with(verb, url, MockResponse::status(status));
    }

    pub fn respond_with(&self, verb: Verb, url: &str, response: MockResponse) {
        self.routes
            .lock()
            .unwrap()
            .insert((verb, url.to_string()), response);
    }

    /// `template` holds one '%s' replaced by each of `paths`.
    pub fn respond_several(&self, verb: Verb, template: &str, status: u16, paths: &[&str]) {
        for path in paths {
            self.respond(verb, &template.replacen("%s", path, 1), status);
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|c| c.url == url).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, url: &str, verb: Verb, timeout: Duration) -> Result<ProbeResult> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            verb,
            timeout,
        });

        let route = self.routes.lock().unwrap().get(&(verb, url.to_string())).cloned();
        let response = match route {
            Some(response) => response,
            None if self.strict => {
                return Err(ScanError::Transport {
                    url: url.to_string(),
                    message: format!("connection refused (no {} route)", verb),
                })
            }
            None => MockResponse::status(404),
        };

        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }

        if response.fail {
            return Err(ScanError::Transport {
                url: url.to_string(),
                message: "request timed out".to_string(),
            });
        }

        Ok(ProbeResult {
            status: response.status,
            content_length: response.content_length,
            redirect_location: response.location,
            body: response.body,
        })
    }
}
