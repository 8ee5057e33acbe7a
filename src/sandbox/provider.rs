//! Provider that creates and attaches sandboxes of one variant.

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::SandboxError;
use super::handle::HttpSandbox;
use super::profile::VariantProfile;
use super::runtime::{ContainerEndpoint, ContainerRuntime};
use super::{Sandbox, SandboxKind, SandboxProvider};

/// Bounded LRU of attached sandboxes keyed by identifier.
pub(crate) struct InstanceCache {
    entries: Mutex<LruCache<String, Arc<dyn Sandbox>>>,
}

impl InstanceCache {
    /// Creates a cache holding at most `capacity` sandboxes, and at least
    /// one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Sandbox>> {
        self.lock().get(id).cloned()
    }

    pub fn insert(&self, id: &str, sandbox: Arc<dyn Sandbox>) {
        self.lock().put(id.to_string(), sandbox);
    }

    pub fn evict(&self, id: &str) {
        if self.lock().pop(id).is_some() {
            debug!("Evicted sandbox {} from instance cache", id);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Arc<dyn Sandbox>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates sandboxes from a [`VariantProfile`] through a container runtime.
pub(crate) struct VariantProvider {
    profile: VariantProfile,
    runtime: Arc<dyn ContainerRuntime>,
    cache: Arc<InstanceCache>,
}

impl VariantProvider {
    pub fn new(
        profile: VariantProfile,
        runtime: Arc<dyn ContainerRuntime>,
        cache_capacity: usize,
    ) -> Self {
        Self {
            profile,
            runtime,
            cache: Arc::new(InstanceCache::new(cache_capacity)),
        }
    }

    fn bind(&self, endpoint: ContainerEndpoint) -> Result<Arc<dyn Sandbox>, SandboxError> {
        let sandbox = HttpSandbox::new(
            &self.profile,
            endpoint,
            Arc::clone(&self.runtime),
            Arc::downgrade(&self.cache),
        )?;
        Ok(Arc::new(sandbox))
    }

    fn container_name(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", self.profile.name_prefix, &suffix[..8])
    }
}

#[async_trait]
impl SandboxProvider for VariantProvider {
    fn kind(&self) -> SandboxKind {
        self.profile.kind
    }

    async fn create(&self) -> Result<Arc<dyn Sandbox>, SandboxError> {
        let name = self.container_name();
        let spec = self.profile.template.instantiate(&name);
        let endpoint = self.runtime.launch(spec).await?;
        let sandbox = self.bind(endpoint)?;
        info!(
            "Created {} sandbox {} at {}",
            self.profile.kind,
            sandbox.id(),
            sandbox.base_url()
        );
        Ok(sandbox)
    }

    async fn get(&self, id: &str) -> Result<Arc<dyn Sandbox>, SandboxError> {
        if let Some(sandbox) = self.cache.get(id) {
            debug!("Instance cache hit for {} sandbox {}", self.profile.kind, id);
            return Ok(sandbox);
        }

        let endpoint = self.runtime.attach(id).await?;
        let sandbox = self.bind(endpoint)?;
        info!(
            "{} sandbox {} address: {}",
            self.profile.kind,
            id,
            sandbox.base_url()
        );
        self.cache.insert(id, Arc::clone(&sandbox));
        Ok(sandbox)
    }
}
