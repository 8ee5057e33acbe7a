//! Runtime for a sandbox reachable at a fixed, externally managed address.
//!
//! Nothing is provisioned or removed; the configured hostname is resolved
//! through the shared [`HostResolver`] because the browser debugging
//! endpoint needs an IP address.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use super::error::SandboxError;
use super::resolver::HostResolver;
use super::runtime::{ContainerEndpoint, ContainerRuntime, ContainerSpec, Ownership};

/// Binds every sandbox to one configured address.
pub(crate) struct ExternalRuntime {
    address: String,
    resolver: Arc<HostResolver>,
}

impl ExternalRuntime {
    pub fn new(address: impl Into<String>, resolver: Arc<HostResolver>) -> Self {
        Self {
            address: address.into(),
            resolver,
        }
    }

    async fn host(&self) -> String {
        match self.resolver.resolve(&self.address).await {
            Some(ip) => ip.to_string(),
            None => {
                warn!(
                    "Could not resolve sandbox address {}; using it verbatim",
                    self.address
                );
                self.address.clone()
            }
        }
    }
}

#[async_trait]
impl ContainerRuntime for ExternalRuntime {
    async fn launch(&self, _spec: ContainerSpec) -> Result<ContainerEndpoint, SandboxError> {
        Ok(ContainerEndpoint {
            name: None,
            host: self.host().await,
            ownership: Ownership::External,
        })
    }

    async fn attach(&self, name: &str) -> Result<ContainerEndpoint, SandboxError> {
        Ok(ContainerEndpoint {
            name: Some(name.to_string()),
            host: self.host().await,
            ownership: Ownership::External,
        })
    }

    async fn remove(&self, _name: &str) -> Result<(), SandboxError> {
        // Not ours to remove
        Ok(())
    }
}
