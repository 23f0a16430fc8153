//! Name to contract resolution cache.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

use super::Contract;
use crate::error::ContractError;

/// Caches parsed contracts by exact name.
///
/// Entries are immutable once inserted and never evicted. A single lock
/// guards lookup-or-insert, so the cache is safe to share between threads
/// behind an `Arc`.
#[derive(Debug, Default)]
pub struct ContractCache {
    entries: Mutex<HashMap<String, Arc<Contract>>>,
}

impl ContractCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached contract for `name`, parsing it on first use.
    ///
    /// Parse failures are not cached.
    pub fn resolve(&self, name: &str) -> Result<Arc<Contract>, ContractError> {
        let mut entries = self.entries.lock();
        if let Some(contract) = entries.get(name) {
            return Ok(Arc::clone(contract));
        }
        let contract = Arc::new(name.parse::<Contract>()?);
        trace!(contract = %name, "cached contract");
        entries.insert(name.to_string(), Arc::clone(&contract));
        Ok(contract)
    }

    /// Number of cached names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing has been cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_resolve_caches_by_name() {
        let cache = ContractCache::new();
        let a = cache.resolve("BTC-27MAR20").unwrap();
        let b = cache.resolve("BTC-27MAR20").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_resolve_error_not_cached() {
        let cache = ContractCache::new();
        assert!(cache.resolve("BTC-NOPE").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_resolve() {
        let cache = Arc::new(ContractCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.resolve("ETH-PERPETUAL").unwrap())
            })
            .collect();
        let first = cache.resolve("ETH-PERPETUAL").unwrap();
        for handle in handles {
            assert!(Arc::ptr_eq(&handle.join().unwrap(), &first));
        }
        assert_eq!(cache.len(), 1);
    }
}
