//! Upstream exporter client.
//!
//! One fetch per scrape, no caching and no retries. The client-level timeout
//! covers connect, headers and body, so a slow upstream never yields a
//! partial payload.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Url;

use promsieve_core::error::{Result, SieveError};

const ACCEPT_EXPOSITION: &str = "text/plain;version=0.0.4;q=1.0,*/*;q=0.1";

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    url: Url,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("promsieve/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SieveError::Config(format!("failed to build HTTP client: {e}")))?;

        tracing::debug!(url = %url, ?timeout, "upstream client initialized");
        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the upstream exposition body.
    pub async fn fetch(&self) -> Result<Bytes> {
        let resp = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, HeaderValue::from_static(ACCEPT_EXPOSITION))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SieveError::UpstreamUnavailable(format!(
                "{} answered {status}",
                self.url
            )));
        }

        resp.bytes().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, e: reqwest::Error) -> SieveError {
        if e.is_timeout() {
            SieveError::UpstreamTimeout(self.timeout)
        } else {
            SieveError::UpstreamUnavailable(format!("{}: {e}", self.url))
        }
    }
}
