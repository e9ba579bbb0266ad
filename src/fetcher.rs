//! Resource fetching from the gateway
//!
//! A fetch performs exactly one GET with a bounded wait and classifies the result
//! into a [`FetchOutcome`]. Remote refusals and transport failures are outcomes,
//! not errors; the only error a fetch returns is a failure to write the fetched
//! content to local storage.

use crate::config::{GatewayConfig, join_url};
use crate::error::{Error, Result};
use crate::types::FetchOutcome;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Retrieves one named resource into a destination file
///
/// This is the seam the range downloader depends on, so the transport can be
/// substituted in tests.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch `resource_name` and, on success, write it to `destination`
    ///
    /// Returns `Err` only for a local storage fault.
    async fn fetch(&self, resource_name: &str, destination: &Path) -> Result<FetchOutcome>;
}

/// Fetcher backed by a reqwest client pointed at a fixed gateway base URL
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpFetcher {
    /// Build a fetcher from gateway settings
    pub fn new(gateway: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(gateway.timeout)
            // A 3xx is reported as a rejection
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("ipfs-dl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: gateway.base_url.clone(),
            timeout: gateway.timeout,
        })
    }

    /// Base URL resource names are appended to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of a named resource
    pub fn resource_url(&self, resource_name: &str) -> String {
        join_url(&self.base_url, resource_name)
    }

    /// Fetch a fully-qualified URL into `destination`
    ///
    /// The outcome's file name is the final path segment of the destination.
    pub async fn fetch_url(&self, url: &str, destination: &Path) -> Result<FetchOutcome> {
        let file_name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.rsplit('/').next().unwrap_or_default().to_string());

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let message = describe_transport_error(&e);
                tracing::debug!(
                    url = %url,
                    error = %message,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "gateway request failed"
                );
                return Ok(FetchOutcome::Errored { file_name, message });
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = status.as_u16(), "gateway rejected request");
            return Ok(FetchOutcome::Rejected {
                file_name,
                status_code: status.as_u16(),
            });
        }

        // Nothing is written until the whole body has arrived
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                let message = describe_transport_error(&e);
                tracing::debug!(url = %url, error = %message, "failed to read gateway response body");
                return Ok(FetchOutcome::Errored { file_name, message });
            }
        };

        tokio::fs::write(destination, &body)
            .await
            .map_err(|e| Error::storage(destination, e))?;

        tracing::debug!(
            url = %url,
            path = %destination.display(),
            bytes = body.len(),
            "stored resource"
        );

        Ok(FetchOutcome::Success {
            file_name,
            raw_content: body.to_vec(),
        })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, resource_name: &str, destination: &Path) -> Result<FetchOutcome> {
        let url = self.resource_url(resource_name);
        self.fetch_url(&url, destination).await
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        format!("Request failed: {}", e)
    }
}
