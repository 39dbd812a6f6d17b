// probe.rs - Probe executor
// Purpose: Issue a single HEAD/GET request and report status, length and redirect target
// HTTP error statuses are data here; only transport failures are errors.

use crate::error::{Result, ScanError};
use crate::output::Output;
use async_trait::async_trait;
use clap::ValueEnum;
use reqwest::header::{CONTENT_LENGTH, LOCATION};
use reqwest::{redirect::Policy, Client, Method};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    #[default]
    Head,
    Get,
}

impl Verb {
    fn method(self) -> Method {
        match self {
            Verb::Head => Method::HEAD,
            Verb::Get => Method::GET,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Head => f.write_str("head"),
            Verb::Get => f.write_str("get"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProbeResult {
    pub status: u16,
    pub content_length: Option<u64>,
    pub redirect_location: Option<String>,
    /// Empty for HEAD requests
    pub body: Vec<u8>,
}

impl ProbeResult {
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    /// Content-Length header when present, otherwise the length of a received body.
    pub fn effective_length(&self) -> Option<u64> {
        self.content_length.or_else(|| {
            if self.body.is_empty() {
                None
            } else {
                Some(self.body.len() as u64)
            }
        })
    }
}

/// One HTTP round trip. Implemented over reqwest in production and scripted in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &str, verb: Verb, timeout: Duration) -> Result<ProbeResult>;
}

/// reqwest-backed transport. The client (and its connection pool) is shared by every probe.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .redirect(Policy::none())
            .build()
            .map_err(|e| ScanError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, url: &str, verb: Verb, timeout: Duration) -> Result<ProbeResult> {
        let transport_error = |e: reqwest::Error| ScanError::Transport {
            url: url.to_string(),
            message: describe_error(&e),
        };

        let response = self
            .client
            .request(verb.method(), url)
            .timeout(timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let headers = response.headers();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let redirect_location = headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = match verb {
            Verb::Head => Vec::new(),
            Verb::Get => response.bytes().await.map_err(transport_error)?.to_vec(),
        };

        Ok(ProbeResult {
            status,
            content_length,
            redirect_location,
            body,
        })
    }
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed ({})", e)
    } else {
        e.to_string()
    }
}

/// Probe executor shared by detection and every enumeration of a scan.
#[derive(Clone)]
pub struct Prober {
    transport: Arc<dyn Transport>,
    output: Arc<dyn Output>,
}

impl Prober {
    pub fn new(transport: Arc<dyn Transport>, output: Arc<dyn Output>) -> Self {
        Self { transport, output }
    }

    pub fn output(&self) -> &Arc<dyn Output> {
        &self.output
    }

    pub async fn probe(&self, url: &str, verb: Verb, timeout: Duration) -> Result<ProbeResult> {
        let result = self.transport.send(url, verb, timeout).await?;

        if result.is_server_error() {
            self.output.warn(&format!(
                "Got a {} error from {}. Is the server overloaded?",
                result.status, url
            ));
        }

        Ok(result)
    }
}
