//! Container runtime seam.
//!
//! Adapters never talk to Docker directly; they go through
//! [`ContainerRuntime`] so an externally managed address (or a test double)
//! can stand in for the daemon.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::error::SandboxError;

/// Who is responsible for the container behind a sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ownership {
    /// Launched by this process.
    Created,
    /// Looked up by name in the runtime.
    Attached,
    /// Statically configured address; never torn down here.
    External,
}

/// Container health check, durations in nanoseconds as Docker expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HealthCheck {
    pub test: Vec<String>,
    pub interval_ns: i64,
    pub timeout_ns: i64,
    pub retries: i64,
}

/// Everything needed to launch one sandbox container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: BTreeMap<String, String>,
    /// `source:target:mode` bind or named-volume mounts.
    pub binds: Vec<String>,
    /// Container ports published on random host ports.
    pub publish: Vec<u16>,
    pub security_opt: Vec<String>,
    pub extra_hosts: Vec<String>,
    pub shm_size: Option<i64>,
    pub network: Option<String>,
    pub healthcheck: Option<HealthCheck>,
    pub auto_remove: bool,
}

impl ContainerSpec {
    /// Environment in `KEY=value` form.
    pub fn env_list(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

/// Where a launched or attached sandbox can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContainerEndpoint {
    /// Container name; `None` for an unnamed external sandbox.
    pub name: Option<String>,
    /// Address the control API listens on.
    pub host: String,
    pub ownership: Ownership,
}

/// Launches, looks up and removes sandbox containers.
#[async_trait]
pub(crate) trait ContainerRuntime: Send + Sync {
    /// Provisions and starts a container from `spec`.
    async fn launch(&self, spec: ContainerSpec) -> Result<ContainerEndpoint, SandboxError>;

    /// Looks up a running container by name.
    async fn attach(&self, name: &str) -> Result<ContainerEndpoint, SandboxError>;

    /// Forcibly removes a container.
    async fn remove(&self, name: &str) -> Result<(), SandboxError>;
}
