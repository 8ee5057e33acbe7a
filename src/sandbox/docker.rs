//! Docker-backed container runtime.

use async_trait::async_trait;
use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, InspectContainerOptions,
    RemoveContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::service::{HealthConfig, HostConfig, PortBinding};
use bollard::Docker;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, info, warn};

use super::error::SandboxError;
use super::network::container_ip;
use super::runtime::{ContainerEndpoint, ContainerRuntime, ContainerSpec, Ownership};

/// Runs sandbox containers on the local Docker daemon.
#[derive(Debug, Default, Clone)]
pub(crate) struct DockerRuntime;

impl DockerRuntime {
    pub fn new() -> Self {
        Self
    }

    /// Connects to the daemon. Done per call so a missing daemon only
    /// matters to the operations that actually need it.
    fn connect(&self) -> Result<Docker, SandboxError> {
        Docker::connect_with_local_defaults().map_err(|e| {
            SandboxError::docker_unavailable(format!("{e}. Is Docker running?"))
        })
    }

    /// Pulls `image` unless it is already present locally.
    async fn ensure_image(&self, docker: &Docker, image: &str) -> Result<(), SandboxError> {
        match docker.inspect_image(image).await {
            Ok(_) => return Ok(()),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => {}
            Err(e) => {
                return Err(SandboxError::provision(format!(
                    "Failed to inspect image {image}: {e}"
                )))
            }
        }

        info!("Pulling sandbox image: {}", image);
        let (from_image, tag) = split_image_ref(image);
        let options = CreateImageOptions {
            from_image,
            tag,
            ..Default::default()
        };
        let mut stream = docker.create_image(Some(options), None, None);

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(output) => {
                    if let Some(error) = output.error {
                        return Err(SandboxError::provision(format!(
                            "Docker pull error for {image}: {error}"
                        )));
                    }
                    if let Some(status) = output.status {
                        debug!("pull {}: {}", image, status.trim());
                    }
                }
                Err(e) => {
                    return Err(SandboxError::provision(format!(
                        "Error pulling image {image}: {e}"
                    )));
                }
            }
        }

        info!("Image pulled: {}", image);
        Ok(())
    }

    async fn inspect_host(&self, docker: &Docker, name: &str) -> Result<String, SandboxError> {
        let inspect = docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
            .map_err(|e| match e {
                DockerError::DockerResponseServerError {
                    status_code: 404, ..
                } => SandboxError::not_found(name),
                other => SandboxError::provision(format!(
                    "Failed to inspect container {name}: {other}"
                )),
            })?;

        container_ip(&inspect).ok_or_else(|| {
            SandboxError::provision(format!("Container {name} has no IP address"))
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn launch(&self, spec: ContainerSpec) -> Result<ContainerEndpoint, SandboxError> {
        let docker = self.connect()?;

        docker
            .ping()
            .await
            .map_err(|e| SandboxError::docker_unavailable(format!("Cannot ping Docker daemon: {e}")))?;

        self.ensure_image(&docker, &spec.image).await?;

        let name = spec.name.clone();
        debug!("Creating container: {}", name);
        docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.clone(),
                    platform: None,
                }),
                build_container_config(&spec),
            )
            .await
            .map_err(|e| SandboxError::provision(format!("Failed to create container {name}: {e}")))?;

        debug!("Starting container: {}", name);
        let started = async {
            docker
                .start_container::<String>(&name, None)
                .await
                .map_err(|e| {
                    SandboxError::provision(format!("Failed to start container {name}: {e}"))
                })?;
            self.inspect_host(&docker, &name).await
        };
        let host = discard_on_failure(&name, started, || self.remove(&name)).await?;
        info!("Sandbox container {} running at {}", name, host);

        Ok(ContainerEndpoint {
            name: Some(name),
            host,
            ownership: Ownership::Created,
        })
    }

    async fn attach(&self, name: &str) -> Result<ContainerEndpoint, SandboxError> {
        let docker = self.connect()?;
        let host = self.inspect_host(&docker, name).await?;
        info!("Attached to sandbox container {} at {}", name, host);

        Ok(ContainerEndpoint {
            name: Some(name.to_string()),
            host,
            ownership: Ownership::Attached,
        })
    }

    async fn remove(&self, name: &str) -> Result<(), SandboxError> {
        let docker = self.connect()?;
        debug!("Removing container: {}", name);

        match docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            Ok(()) => Ok(()),
            // Auto-removed containers may already be gone
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                warn!("Container {} was already removed", name);
                Ok(())
            }
            Err(e) => Err(SandboxError::provision(format!(
                "Failed to remove container {name}: {e}"
            ))),
        }
    }
}

/// Awaits the post-create launch steps, force-removing the container when
/// any of them fails.
async fn discard_on_failure<T, Steps, Cleanup, CleanupFut>(
    name: &str,
    steps: Steps,
    cleanup: Cleanup,
) -> Result<T, SandboxError>
where
    Steps: Future<Output = Result<T, SandboxError>>,
    Cleanup: FnOnce() -> CleanupFut,
    CleanupFut: Future<Output = Result<(), SandboxError>>,
{
    match steps.await {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("Launch of container {} failed, removing it", name);
            if let Err(cleanup_err) = cleanup().await {
                warn!("Failed to remove container {}: {}", name, cleanup_err);
            }
            Err(e)
        }
    }
}

/// Splits an image reference into repository and tag for a pull.
///
/// Untagged references pull `latest`; digest references are passed whole.
fn split_image_ref(image: &str) -> (&str, &str) {
    if image.contains('@') {
        return (image, "");
    }
    let name_start = image.rfind('/').map_or(0, |i| i + 1);
    match image[name_start..].rfind(':') {
        Some(i) => (&image[..name_start + i], &image[name_start + i + 1..]),
        None => (image, "latest"),
    }
}

/// Translates a [`ContainerSpec`] into the Docker create request.
fn build_container_config(spec: &ContainerSpec) -> ContainerConfig<String> {
    let exposed_ports: HashMap<String, HashMap<(), ()>> = spec
        .publish
        .iter()
        .map(|port| (format!("{port}/tcp"), HashMap::new()))
        .collect();

    // Empty host port lets Docker pick a random one
    let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = spec
        .publish
        .iter()
        .map(|port| {
            (
                format!("{port}/tcp"),
                Some(vec![PortBinding {
                    host_ip: Some(String::new()),
                    host_port: Some(String::new()),
                }]),
            )
        })
        .collect();

    let non_empty = |v: &Vec<String>| (!v.is_empty()).then(|| v.clone());

    ContainerConfig {
        image: Some(spec.image.clone()),
        env: Some(spec.env_list()),
        exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
        healthcheck: spec.healthcheck.as_ref().map(|hc| HealthConfig {
            test: Some(hc.test.clone()),
            interval: Some(hc.interval_ns),
            timeout: Some(hc.timeout_ns),
            retries: Some(hc.retries),
            ..Default::default()
        }),
        host_config: Some(HostConfig {
            binds: non_empty(&spec.binds),
            port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
            security_opt: non_empty(&spec.security_opt),
            extra_hosts: non_empty(&spec.extra_hosts),
            shm_size: spec.shm_size,
            network_mode: spec.network.clone(),
            auto_remove: Some(spec.auto_remove),
            ..Default::default()
        }),
        ..Default::default()
    }
}
