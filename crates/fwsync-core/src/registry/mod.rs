//! Plugin-based component registry
//!
//! The registry lets transports and domain-list sources be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fwsync_core::registry::ComponentRegistry;
//!
//! let registry = ComponentRegistry::new();
//! fwsync_ssh::register(&registry);
//! fwsync_lists_http::register(&registry);
//!
//! let transport = registry.create_transport(&config.transport)?;
//! let source = registry.create_list_source("https://example.org/list.txt")?;
//! ```
//!
//! List sources are keyed by URL scheme (`http`, `https`, ...).

use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::traits::{CommandTransport, DomainListSource};
use crate::traits::{DomainListSourceFactory, TransportFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry of transport and list-source factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered transport factories
    transports: RwLock<HashMap<String, Box<dyn TransportFactory>>>,

    /// Registered list source factories, by URL scheme
    list_sources: RwLock<HashMap<String, Box<dyn DomainListSourceFactory>>>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transport factory
    ///
    /// # Parameters
    ///
    /// - `name`: Transport type name (e.g., "ssh")
    /// - `factory`: Factory object for creating transport instances
    pub fn register_transport(&self, name: impl Into<String>, factory: Box<dyn TransportFactory>) {
        let mut transports = self.transports.write().unwrap_or_else(PoisonError::into_inner);
        transports.insert(name.into(), factory);
    }

    /// Register a list source factory for a URL scheme
    pub fn register_list_source(
        &self,
        scheme: impl Into<String>,
        factory: Box<dyn DomainListSourceFactory>,
    ) {
        let mut sources = self.list_sources.write().unwrap_or_else(PoisonError::into_inner);
        sources.insert(scheme.into(), factory);
    }

    /// Create a transport from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn CommandTransport>)`: Created transport instance
    /// - `Err(Error)`: If the transport type is not registered or creation fails
    pub fn create_transport(&self, config: &TransportConfig) -> Result<Box<dyn CommandTransport>> {
        let transport_type = config.type_name();
        let transports = self.transports.read().unwrap_or_else(PoisonError::into_inner);

        let factory = transports
            .get(transport_type)
            .ok_or_else(|| Error::config(format!("Unknown transport type: {}", transport_type)))?;

        factory.create(config)
    }

    /// Create a list source for `location`, chosen by its URL scheme
    pub fn create_list_source(&self, location: &str) -> Result<Box<dyn DomainListSource>> {
        let (scheme, _) = location
            .split_once("://")
            .ok_or_else(|| Error::config(format!("Domain list location has no scheme: {}", location)))?;

        let sources = self.list_sources.read().unwrap_or_else(PoisonError::into_inner);

        let factory = sources
            .get(scheme)
            .ok_or_else(|| Error::config(format!("Unsupported domain list scheme: {}", scheme)))?;

        factory.create(location)
    }

    /// List all registered transport types
    pub fn list_transports(&self) -> Vec<String> {
        let transports = self.transports.read().unwrap_or_else(PoisonError::into_inner);
        transports.keys().cloned().collect()
    }

    /// List all registered list source schemes
    pub fn list_list_sources(&self) -> Vec<String> {
        let sources = self.list_sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.keys().cloned().collect()
    }

    /// Check if a transport type is registered
    pub fn has_transport(&self, name: &str) -> bool {
        let transports = self.transports.read().unwrap_or_else(PoisonError::into_inner);
        transports.contains_key(name)
    }

    /// Check if a list source scheme is registered
    pub fn has_list_source(&self, scheme: &str) -> bool {
        let sources = self.list_sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.contains_key(scheme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct MockTransportFactory;

    impl TransportFactory for MockTransportFactory {
        fn create(&self, _config: &TransportConfig) -> Result<Box<dyn CommandTransport>> {
            Err(Error::config("Mock transport not implemented"))
        }
    }

    struct StaticSource(String);

    #[async_trait]
    impl DomainListSource for StaticSource {
        async fn fetch_lines(&self) -> Result<Vec<String>> {
            Ok(vec!["example.com".to_string()])
        }

        fn location(&self) -> &str {
            &self.0
        }
    }

    struct StaticSourceFactory;

    impl DomainListSourceFactory for StaticSourceFactory {
        fn create(&self, location: &str) -> Result<Box<dyn DomainListSource>> {
            Ok(Box::new(StaticSource(location.to_string())))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = ComponentRegistry::new();

        assert!(!registry.has_transport("mock"));
        registry.register_transport("mock", Box::new(MockTransportFactory));
        assert!(registry.has_transport("mock"));
        assert!(registry.list_transports().contains(&"mock".to_string()));
    }

    #[test]
    fn test_unknown_transport_is_config_error() {
        let registry = ComponentRegistry::new();
        let config = TransportConfig::Custom {
            factory: "telnet".to_string(),
            config: serde_json::json!({}),
        };

        assert!(matches!(registry.create_transport(&config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_list_source_chosen_by_scheme() {
        let registry = ComponentRegistry::new();
        registry.register_list_source("https", Box::new(StaticSourceFactory));

        let source = registry.create_list_source("https://lists.example/a.txt").unwrap();
        assert_eq!(source.location(), "https://lists.example/a.txt");
        assert_eq!(source.fetch_lines().await.unwrap(), vec!["example.com"]);

        assert!(registry.create_list_source("ftp://lists.example/a.txt").is_err());
        assert!(registry.create_list_source("lists.example/a.txt").is_err());
        assert!(registry.has_list_source("https"));
        assert_eq!(registry.list_list_sources(), vec!["https"]);
    }
}
