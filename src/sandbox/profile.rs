//! Per-variant wiring: container template, ports, routes and readiness.

use std::collections::BTreeMap;
use std::time::Duration;

use super::api::CallPlan;
use super::readiness::ReadinessProbe;
use super::runtime::{ContainerSpec, HealthCheck};
use super::SandboxKind;
use crate::config::{PortsConfig, ReadinessConfig};

/// Call plan for every operation of the capability surface.
#[derive(Debug)]
pub(crate) struct RouteTable {
    pub exec: CallPlan,
    pub view: CallPlan,
    pub wait: CallPlan,
    pub write_input: CallPlan,
    pub kill: CallPlan,
    /// Overwrite semantics; appends are downgraded to `Replay::Unsent`.
    pub file_write: CallPlan,
    pub file_read: CallPlan,
    pub file_exists: CallPlan,
    pub file_delete: CallPlan,
    pub file_list: CallPlan,
    pub file_replace: CallPlan,
    pub file_search: CallPlan,
    pub file_find: CallPlan,
    pub file_upload: CallPlan,
    pub file_download: CallPlan,
}

/// Container settings shared by every sandbox of a variant.
#[derive(Debug, Clone, Default)]
pub(crate) struct ContainerTemplate {
    pub image: String,
    pub env: BTreeMap<String, String>,
    /// `(volume, target)` pairs; `{name}` in the volume becomes the
    /// container name.
    pub volumes: Vec<(String, String)>,
    pub publish: Vec<u16>,
    pub security_opt: Vec<String>,
    pub extra_hosts: Vec<String>,
    pub shm_size: Option<i64>,
    pub network: Option<String>,
    pub healthcheck: Option<HealthCheck>,
    pub auto_remove: bool,
}

impl ContainerTemplate {
    /// Launch spec for a container called `name`.
    pub fn instantiate(&self, name: &str) -> ContainerSpec {
        ContainerSpec {
            name: name.to_string(),
            image: self.image.clone(),
            env: self.env.clone(),
            binds: self
                .volumes
                .iter()
                .map(|(volume, target)| format!("{}:{target}:rw", volume.replace("{name}", name)))
                .collect(),
            publish: self.publish.clone(),
            security_opt: self.security_opt.clone(),
            extra_hosts: self.extra_hosts.clone(),
            shm_size: self.shm_size,
            network: self.network.clone(),
            healthcheck: self.healthcheck.clone(),
            auto_remove: self.auto_remove,
        }
    }
}

/// Everything that distinguishes one variant's sandboxes from another's.
#[derive(Debug, Clone)]
pub(crate) struct VariantProfile {
    pub kind: SandboxKind,
    /// Containers are named `<prefix>-<8 hex>`; only those are ever removed.
    pub name_prefix: String,
    pub ports: PortsConfig,
    pub routes: &'static RouteTable,
    pub probe: ReadinessProbe,
    pub template: ContainerTemplate,
    pub readiness: ReadinessConfig,
    pub api_timeout: Duration,
}

impl VariantProfile {
    /// Identifier of a sandbox that has no container name.
    pub fn placeholder_id(&self) -> String {
        format!("{}-sandbox-dev", self.kind)
    }

    /// Whether `name` looks like a container this variant launches.
    pub fn owns_name(&self, name: &str) -> bool {
        name.strip_prefix(self.name_prefix.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instantiate_names_volumes_after_container() {
        let template = ContainerTemplate {
            image: "img".to_string(),
            volumes: vec![(
                "aio-{name}-workspace".to_string(),
                "/home/gem/workspace".to_string(),
            )],
            auto_remove: true,
            ..Default::default()
        };
        let spec = template.instantiate("aio-sandbox-0f3a9c21");
        assert_eq!(spec.name, "aio-sandbox-0f3a9c21");
        assert_eq!(
            spec.binds,
            vec!["aio-aio-sandbox-0f3a9c21-workspace:/home/gem/workspace:rw"]
        );
        assert!(spec.auto_remove);
    }
}
