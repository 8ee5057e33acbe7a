//! Dispatch from a [`SandboxKind`] to the provider that builds it.

use std::sync::Arc;
use tracing::info;

use super::docker::DockerRuntime;
use super::error::SandboxError;
use super::external::ExternalRuntime;
use super::provider::VariantProvider;
use super::resolver::HostResolver;
use super::runtime::ContainerRuntime;
use super::{aio, legacy, Sandbox, SandboxKind, SandboxProvider};
use crate::config::Config;

/// Registry holding one provider per variant.
pub(crate) struct SandboxFactory {
    config: Arc<Config>,
    legacy: Arc<dyn SandboxProvider>,
    aio: Arc<dyn SandboxProvider>,
}

impl SandboxFactory {
    /// Builds providers on Docker, or on the configured external address.
    pub fn new(config: Arc<Config>) -> Self {
        let runtime: Arc<dyn ContainerRuntime> = match &config.sandbox_address {
            Some(address) => {
                info!("Using externally managed sandbox at {}", address);
                let resolver = Arc::new(HostResolver::new(config.resolver_cache_size));
                Arc::new(ExternalRuntime::new(address.clone(), resolver))
            }
            None => Arc::new(DockerRuntime::new()),
        };
        Self::with_runtime(config, runtime)
    }

    /// Builds providers on an explicit runtime.
    pub fn with_runtime(config: Arc<Config>, runtime: Arc<dyn ContainerRuntime>) -> Self {
        let legacy = VariantProvider::new(
            legacy::profile(&config),
            Arc::clone(&runtime),
            config.instance_cache_size,
        );
        let aio = VariantProvider::new(aio::profile(&config), runtime, config.instance_cache_size);

        Self {
            config,
            legacy: Arc::new(legacy),
            aio: Arc::new(aio),
        }
    }

    /// Parses a variant tag; unknown tags fail before anything is touched.
    pub fn parse_kind(tag: &str) -> Result<SandboxKind, SandboxError> {
        tag.parse()
    }

    pub fn provider(&self, kind: SandboxKind) -> Arc<dyn SandboxProvider> {
        match kind {
            SandboxKind::Legacy => Arc::clone(&self.legacy),
            SandboxKind::Aio => Arc::clone(&self.aio),
        }
    }

    pub async fn create_sandbox(&self, kind: SandboxKind) -> Result<Arc<dyn Sandbox>, SandboxError> {
        info!("Creating {} sandbox", kind);
        self.provider(kind).create().await
    }

    pub async fn get_sandbox(
        &self,
        id: &str,
        kind: SandboxKind,
    ) -> Result<Arc<dyn Sandbox>, SandboxError> {
        info!("Getting {} sandbox: {}", kind, id);
        self.provider(kind).get(id).await
    }

    /// `Aio` when enabled in configuration, otherwise `Legacy`.
    pub fn default_kind(&self) -> SandboxKind {
        if self.config.aio.enabled {
            SandboxKind::Aio
        } else {
            SandboxKind::Legacy
        }
    }

    pub fn is_aio_enabled(&self) -> bool {
        self.config.aio.enabled
    }

    pub async fn create_default_sandbox(&self) -> Result<Arc<dyn Sandbox>, SandboxError> {
        self.create_sandbox(self.default_kind()).await
    }

    pub async fn get_default_sandbox(&self, id: &str) -> Result<Arc<dyn Sandbox>, SandboxError> {
        self.get_sandbox(id, self.default_kind()).await
    }
}
