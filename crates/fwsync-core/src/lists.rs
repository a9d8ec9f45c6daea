// # File Domain Lists
//
// Built-in `DomainListSource` for lists stored on the local filesystem,
// addressed as `file:///path/to/list.txt`.
//
// Remote schemes live in their own crates; this one needs nothing beyond
// tokio's filesystem support, so it ships with the core.

use crate::error::{Error, Result};
use crate::registry::ComponentRegistry;
use crate::traits::{DomainListSource, DomainListSourceFactory};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// URL scheme handled by this module
pub const FILE_SCHEME: &str = "file";

/// Domain list read from a local file
#[derive(Debug)]
pub struct FileListSource {
    location: String,
    path: PathBuf,
}

impl FileListSource {
    /// Create a source from a `file://` location
    pub fn new(location: &str) -> Result<Self> {
        let path = location
            .strip_prefix("file://")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::config(format!("Not a file location: {}", location)))?;

        Ok(Self {
            location: location.to_string(),
            path: PathBuf::from(path),
        })
    }
}

#[async_trait]
impl DomainListSource for FileListSource {
    async fn fetch_lines(&self) -> Result<Vec<String>> {
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            Error::domain_list(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        Ok(content.lines().map(str::to_string).collect())
    }

    fn location(&self) -> &str {
        &self.location
    }
}

/// Factory for [`FileListSource`]
pub struct FileListFactory;

impl DomainListSourceFactory for FileListFactory {
    fn create(&self, location: &str) -> Result<Box<dyn DomainListSource>> {
        Ok(Box::new(FileListSource::new(location)?))
    }
}

/// Register the `file` scheme with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_list_source(FILE_SCHEME, Box::new(FileListFactory));
}
