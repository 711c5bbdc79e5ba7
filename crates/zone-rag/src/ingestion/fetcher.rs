//! Document download over HTTP(S)

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::{Error, FetchErrorKind, Result};
use crate::types::{DocumentRef, RawDocument};

/// Retrieves the raw bytes behind a document reference
///
/// Implementations make exactly one attempt per call and never retry.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch the document, failing once `timeout` elapses
    async fn fetch(&self, doc: &DocumentRef, timeout: Duration) -> Result<RawDocument>;

    /// Get fetcher name for logging
    fn name(&self) -> &str;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new fetcher
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, doc: &DocumentRef, timeout: Duration) -> Result<RawDocument> {
        tracing::info!("Fetching {} document from {}", doc.zone, doc.url);

        let response = self
            .client
            .get(&doc.url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::from_fetch(&doc.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(
                &doc.url,
                FetchErrorKind::HttpStatus(status.as_u16()),
                status.canonical_reason().unwrap_or("request failed"),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::from_fetch(&doc.url, e))?;

        tracing::debug!("Fetched {} bytes for zone {}", bytes.len(), doc.zone);

        Ok(RawDocument {
            source: doc.clone(),
            bytes,
            content_type,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
