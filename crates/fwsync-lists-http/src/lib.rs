// # HTTP Domain Lists
//
// This crate provides a `DomainListSource` that downloads plain-text domain
// lists (one pattern per line, geosite-style prefixes allowed) over HTTP or
// HTTPS.
//
// ## Failure Policy
//
// Lists are fetched once, at startup. Any transport error or non-success
// status fails the fetch; the daemon refuses to start with a partial watch
// list.

use async_trait::async_trait;
use fwsync_core::traits::{DomainListSource, DomainListSourceFactory};
use fwsync_core::{ComponentRegistry, Error, Result};
use std::time::Duration;

/// Default HTTP timeout for list downloads (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Domain list served over HTTP(S)
#[derive(Debug)]
pub struct HttpListSource {
    /// List URL
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpListSource {
    /// Create a source with the default timeout
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a source with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl DomainListSource for HttpListSource {
    async fn fetch_lines(&self) -> Result<Vec<String>> {
        tracing::debug!("Fetching domain list from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::http(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::http(format!(
                "Failed to fetch {}: HTTP {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response: {}", e)))?;

        Ok(body.lines().map(str::to_string).collect())
    }

    fn location(&self) -> &str {
        &self.url
    }
}

/// Factory for creating HTTP list sources
pub struct HttpListFactory;

impl DomainListSourceFactory for HttpListFactory {
    fn create(&self, location: &str) -> Result<Box<dyn DomainListSource>> {
        Ok(Box::new(HttpListSource::new(location)?))
    }
}

/// Register the `http` and `https` schemes with a registry
///
/// # Example
///
/// ```rust
/// use fwsync_core::ComponentRegistry;
///
/// let registry = ComponentRegistry::new();
/// fwsync_lists_http::register(&registry);
/// assert!(registry.has_list_source("https"));
/// ```
pub fn register(registry: &ComponentRegistry) {
    registry.register_list_source("http", Box::new(HttpListFactory));
    registry.register_list_source("https", Box::new(HttpListFactory));
}
