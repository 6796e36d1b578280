// # Address Cache
//
// Latest resolved addresses per configured host, shared between the
// refresh loops (one writer per host) and any number of readers.
//
// ## Locking
//
// A single reader/writer lock covers the whole map. Writes replace one
// host's entry and are rare (one per host per refresh); reads traverse
// every entry. The lock is a blocking `std::sync::RwLock` so `snapshot()`
// can be called from synchronous code; it is never held across an await.
//
// ## Key Set
//
// The key set is fixed at construction. `set()` on a host that was not
// configured is ignored, so the cache never grows beyond the configured
// hosts.

use ipnet::IpNet;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

/// Addresses currently associated with one host, as single-address prefixes
pub type AddressEntry = Vec<IpNet>;

/// Shared map from host name to its current [`AddressEntry`]
///
/// Cloning is cheap and yields a handle to the same map.
///
/// # Example
///
/// ```rust
/// use dnsrange_core::AddressCache;
/// use ipnet::IpNet;
///
/// let cache = AddressCache::new(["a.example", "b.example"]);
/// cache.set("a.example", vec![IpNet::from("192.0.2.1".parse::<std::net::IpAddr>().unwrap())]);
///
/// assert_eq!(cache.snapshot().len(), 1);
/// assert_eq!(cache.get("b.example"), Some(vec![]));
/// ```
#[derive(Debug, Clone)]
pub struct AddressCache {
    inner: Arc<RwLock<HashMap<String, AddressEntry>>>,
}

impl AddressCache {
    /// Create a cache with an empty entry for each of `hosts`
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let map = hosts
            .into_iter()
            .map(|host| (host.into(), AddressEntry::new()))
            .collect();

        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Replace the entry for `host`
    ///
    /// The entry is swapped in as one unit under the write lock; readers
    /// see either the old or the new entry, never a mix.
    pub fn set(&self, host: &str, entry: AddressEntry) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match guard.get_mut(host) {
            Some(slot) => *slot = entry,
            None => warn!(host, "ignoring update for unconfigured host"),
        }
    }

    /// Concatenation of every host's current entry, in unspecified host order
    pub fn snapshot(&self) -> Vec<IpNet> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.values().flatten().copied().collect()
    }

    /// Current entry for one host
    pub fn get(&self, host: &str) -> Option<AddressEntry> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(host).cloned()
    }

    /// Configured host names, in unspecified order
    pub fn hosts(&self) -> Vec<String> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.keys().cloned().collect()
    }

    /// Number of configured hosts
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no hosts are configured
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
