// # Domain List Source Trait
//
// Defines the interface for fetching watch-list text.
//
// ## Implementations
//
// - HTTP(S): `fwsync-lists-http` crate
//
// Sources only deliver raw lines. Validation and prefix stripping belong to
// `DomainMatcher::extend_from_lines`.

use async_trait::async_trait;

/// Trait for domain list sources
#[async_trait]
pub trait DomainListSource: Send + Sync {
    /// Fetch the raw text lines of the list
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<String>)`: Every line, unvalidated
    /// - `Err(Error)`: If the list could not be fetched or read
    async fn fetch_lines(&self) -> Result<Vec<String>, crate::Error>;

    /// Where the list comes from (for logging)
    fn location(&self) -> &str;
}

/// Helper trait for constructing list sources from a location string
pub trait DomainListSourceFactory: Send + Sync {
    /// Create a DomainListSource for `location` (typically a URL)
    fn create(&self, location: &str) -> Result<Box<dyn DomainListSource>, crate::Error>;
}
