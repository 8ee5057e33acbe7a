//! Container address discovery from Docker network settings.

use bollard::service::ContainerInspectResponse;

/// Returns the address a container is reachable at.
///
/// The default bridge address wins; containers attached only to a
/// user-defined network have an empty default address, in which case the
/// first network (by name) with an address is used.
pub(crate) fn container_ip(inspect: &ContainerInspectResponse) -> Option<String> {
    let settings = inspect.network_settings.as_ref()?;

    if let Some(ip) = settings.ip_address.as_deref().filter(|ip| !ip.is_empty()) {
        return Some(ip.to_string());
    }

    let networks = settings.networks.as_ref()?;
    let mut names: Vec<&String> = networks.keys().collect();
    names.sort();
    names.into_iter().find_map(|name| {
        networks[name]
            .ip_address
            .as_deref()
            .filter(|ip| !ip.is_empty())
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::service::{EndpointSettings, NetworkSettings};
    use std::collections::HashMap;

    fn inspect_with(ip: Option<&str>, networks: &[(&str, &str)]) -> ContainerInspectResponse {
        let networks: HashMap<String, EndpointSettings> = networks
            .iter()
            .map(|(name, ip)| {
                (
                    (*name).to_string(),
                    EndpointSettings {
                        ip_address: Some((*ip).to_string()),
                        ..Default::default()
                    },
                )
            })
            .collect();
        ContainerInspectResponse {
            network_settings: Some(NetworkSettings {
                ip_address: ip.map(str::to_string),
                networks: Some(networks),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_bridge_address_wins() {
        let inspect = inspect_with(Some("172.17.0.5"), &[("manus", "10.0.0.9")]);
        assert_eq!(container_ip(&inspect).as_deref(), Some("172.17.0.5"));
    }

    #[test]
    fn test_falls_back_to_named_network() {
        let inspect = inspect_with(Some(""), &[("manus", "10.0.0.9")]);
        assert_eq!(container_ip(&inspect).as_deref(), Some("10.0.0.9"));
    }

    #[test]
    fn test_skips_networks_without_address() {
        let inspect = inspect_with(None, &[("a-net", ""), ("b-net", "10.0.1.2")]);
        assert_eq!(container_ip(&inspect).as_deref(), Some("10.0.1.2"));
    }

    #[test]
    fn test_no_network_settings() {
        let inspect = ContainerInspectResponse::default();
        assert!(container_ip(&inspect).is_none());
    }
}
