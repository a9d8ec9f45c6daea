// # Address Cache
//
// In-memory set of addresses known to be present in the device's address
// list.
//
// ## Purpose
//
// Suppresses duplicate remote writes. It is not a mirror of the device: it
// only grows, and only with addresses the device confirmed (or listed at
// startup).
//
// ## Crash Behavior
//
// - Nothing is persisted; the cache is re-seeded from the device on start
// - Addresses written right before a crash are recovered by that re-seed
//
// ## Concurrency
//
// Readers share the lock; writers are exclusive. Once `add_if_new` returns,
// every later `contains` observes the new entries. Entries are never removed.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Deduplicating address cache
///
/// Cloning is cheap and every clone shares the same set, so one instance can
/// be handed to each component that needs it.
///
/// # Example
///
/// ```rust
/// use fwsync_core::AddressCache;
///
/// #[tokio::main]
/// async fn main() {
///     let cache = AddressCache::new();
///     cache.seed(["203.0.113.5".to_string()]).await;
///
///     assert!(cache.contains("203.0.113.5").await);
///     assert!(cache.add_if_new(&["198.51.100.1".to_string()]).await);
///     assert!(!cache.add_if_new(&["198.51.100.1".to_string()]).await);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AddressCache {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl AddressCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load addresses already present on the device
    pub async fn seed<I>(&self, addresses: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut guard = self.inner.write().await;
        guard.extend(addresses);
    }

    /// Insert every address not yet present
    ///
    /// Returns `true` iff at least one address was newly inserted.
    pub async fn add_if_new(&self, addresses: &[String]) -> bool {
        let mut guard = self.inner.write().await;
        let mut added = false;
        for addr in addresses {
            if guard.insert(addr.clone()) {
                added = true;
            }
        }
        added
    }

    /// Whether `address` is known to be on the device
    pub async fn contains(&self, address: &str) -> bool {
        self.inner.read().await.contains(address)
    }

    /// Get the number of cached addresses
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_if_new_reports_first_insert_only() {
        let cache = AddressCache::new();
        let x = vec!["192.0.2.1".to_string()];

        assert!(cache.add_if_new(&x).await);
        assert!(cache.contains("192.0.2.1").await);

        assert!(!cache.add_if_new(&x).await);
        assert!(cache.contains("192.0.2.1").await);
    }

    #[tokio::test]
    async fn test_mixed_batch_counts_as_new() {
        let cache = AddressCache::new();
        cache.seed(["192.0.2.1".to_string()]).await;

        let batch = vec!["192.0.2.1".to_string(), "192.0.2.2".to_string()];
        assert!(cache.add_if_new(&batch).await);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_seed_does_not_duplicate() {
        let cache = AddressCache::new();
        assert!(cache.is_empty().await);

        cache
            .seed(vec!["192.0.2.1".to_string(), "192.0.2.1".to_string()])
            .await;
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let cache = AddressCache::new();
        let other = cache.clone();

        other.add_if_new(&["2001:db8::1".to_string()]).await;
        assert!(cache.contains("2001:db8::1").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_insert_once() {
        let cache = AddressCache::new();
        let mut handles = Vec::new();

        for _ in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.add_if_new(&["198.51.100.42".to_string()]).await
            }));
        }

        let mut newly_added = 0;
        for handle in handles {
            if handle.await.unwrap() {
                newly_added += 1;
            }
        }

        assert_eq!(newly_added, 1, "exactly one writer should observe the insert");
        assert!(cache.contains("198.51.100.42").await);
    }
}
