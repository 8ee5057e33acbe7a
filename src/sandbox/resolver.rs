//! Bounded memoizing hostname resolver.
//!
//! The browser debugging protocol wants an IP address, so a configured
//! sandbox hostname is resolved once and remembered. Failed lookups are
//! cached too, so a misconfigured address is not re-queried on every call.

use lru::LruCache;
use std::net::{IpAddr, Ipv4Addr};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use tracing::{debug, error};

/// Thread-safe LRU cache of hostname → IPv4 resolutions.
pub(crate) struct HostResolver {
    cache: Mutex<LruCache<String, Option<Ipv4Addr>>>,
}

impl HostResolver {
    /// Creates a resolver holding at most `capacity` hostnames, and at
    /// least one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Resolves `host` to its first IPv4 address.
    ///
    /// Dotted-quad input is returned unchanged without a lookup. `None`
    /// means resolution failed; that answer is cached like any other.
    pub async fn resolve(&self, host: &str) -> Option<Ipv4Addr> {
        if let Ok(ip) = host.parse::<Ipv4Addr>() {
            return Some(ip);
        }

        if let Some(cached) = self.cached(host) {
            debug!("Resolver cache hit for {}", host);
            return cached;
        }

        let resolved = lookup_ipv4(host).await;
        self.insert(host, resolved);
        resolved
    }

    fn cached(&self, host: &str) -> Option<Option<Ipv4Addr>> {
        self.lock().get(host).copied()
    }

    fn insert(&self, host: &str, value: Option<Ipv4Addr>) {
        self.lock().put(host.to_string(), value);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Option<Ipv4Addr>>> {
        // A poisoned cache still holds valid entries.
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

async fn lookup_ipv4(host: &str) -> Option<Ipv4Addr> {
    match tokio::net::lookup_host((host, 0)).await {
        Ok(addrs) => {
            let found = addrs.into_iter().find_map(|addr| match addr.ip() {
                IpAddr::V4(ip) => Some(ip),
                IpAddr::V6(_) => None,
            });
            if found.is_none() {
                error!("Hostname {} has no IPv4 address", host);
            }
            found
        }
        Err(e) => {
            error!("Failed to resolve hostname {}: {}", host, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::provider::InstanceCache;

    impl HostResolver {
        pub(crate) fn len(&self) -> usize {
            self.lock().len()
        }

        fn capacity(&self) -> usize {
            self.lock().cap().get()
        }
    }

    #[tokio::test]
    async fn test_literal_address_returned_unchanged() {
        let resolver = HostResolver::new(4);
        let ip = resolver.resolve("10.1.2.3").await;
        assert_eq!(ip, Some(Ipv4Addr::new(10, 1, 2, 3)));
        // Literals bypass the cache entirely
        assert_eq!(resolver.len(), 0);
    }

    #[tokio::test]
    async fn test_localhost_resolves_and_is_stable() {
        let resolver = HostResolver::new(4);
        let first = resolver.resolve("localhost").await;
        let second = resolver.resolve("localhost").await;
        assert_eq!(first, second);
        assert_eq!(resolver.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_resolution_is_cached() {
        let resolver = HostResolver::new(4);
        let host = "does-not-exist.invalid";
        assert_eq!(resolver.resolve(host).await, None);
        assert_eq!(resolver.len(), 1);
        assert_eq!(resolver.cached(host), Some(None));
    }

    #[test]
    fn test_capacity_bound_evicts_exactly_one() {
        let resolver = HostResolver::new(2);
        resolver.insert("a", Some(Ipv4Addr::new(1, 1, 1, 1)));
        resolver.insert("b", Some(Ipv4Addr::new(2, 2, 2, 2)));
        assert_eq!(resolver.len(), 2);

        // Touch "a" so "b" becomes least recently used
        assert!(resolver.cached("a").is_some());
        resolver.insert("c", None);

        assert_eq!(resolver.len(), 2);
        assert!(resolver.cached("a").is_some());
        assert!(resolver.cached("b").is_none());
        assert_eq!(resolver.cached("c"), Some(None));
    }

    #[test]
    fn test_zero_capacity_keeps_one_entry() {
        let resolver = HostResolver::new(0);
        assert_eq!(resolver.capacity(), 1);
        assert_eq!(resolver.capacity(), InstanceCache::new(0).capacity());
    }
}
