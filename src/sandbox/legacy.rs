//! Original sandbox image: `/api/v1/...` routes only, supervisor readiness.

use std::collections::BTreeMap;

use super::api::{CallPlan, Replay, Route};
use super::profile::{ContainerTemplate, RouteTable, VariantProfile};
use super::readiness::ReadinessProbe;
use super::SandboxKind;
use crate::config::Config;

const fn single(label: &'static str, replay: Replay, path: &'static str) -> CallPlan {
    CallPlan::single(label, replay, Route::envelope(path))
}

static ROUTES: RouteTable = RouteTable {
    exec: single("Command execution", Replay::Unsent, "/api/v1/shell/exec"),
    view: single("Shell view", Replay::Always, "/api/v1/shell/view"),
    wait: single("Process wait", Replay::Always, "/api/v1/shell/wait"),
    write_input: single("Process write", Replay::Unsent, "/api/v1/shell/write"),
    kill: single("Process kill", Replay::Always, "/api/v1/shell/kill"),
    file_write: single("File write", Replay::Always, "/api/v1/file/write"),
    file_read: single("File read", Replay::Always, "/api/v1/file/read"),
    file_exists: single("File exists check", Replay::Always, "/api/v1/file/exists"),
    file_delete: single("File delete", Replay::Always, "/api/v1/file/delete"),
    file_list: single("File list", Replay::Always, "/api/v1/file/list"),
    file_replace: single("File replace", Replay::Unsent, "/api/v1/file/replace"),
    file_search: single("File search", Replay::Always, "/api/v1/file/search"),
    file_find: single("File find", Replay::Always, "/api/v1/file/find"),
    file_upload: single("File upload", Replay::Unsent, "/api/v1/file/upload"),
    file_download: single("File download", Replay::Always, "/api/v1/file/download"),
};

pub(crate) fn profile(config: &Config) -> VariantProfile {
    let legacy = &config.legacy;

    let env: BTreeMap<String, String> = [
        ("SERVICE_TIMEOUT_MINUTES", legacy.ttl_minutes.map(|m| m.to_string())),
        ("CHROME_ARGS", legacy.chrome_args.clone()),
        ("HTTPS_PROXY", legacy.https_proxy.clone()),
        ("HTTP_PROXY", legacy.http_proxy.clone()),
        ("NO_PROXY", legacy.no_proxy.clone()),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
    .collect();

    let template = ContainerTemplate {
        image: legacy.image.clone(),
        env,
        network: config.sandbox_network.clone(),
        auto_remove: true,
        ..Default::default()
    };

    VariantProfile {
        kind: SandboxKind::Legacy,
        name_prefix: legacy.name_prefix.clone(),
        ports: legacy.ports,
        routes: &ROUTES,
        probe: ReadinessProbe::SupervisorRunning {
            path: "/api/v1/supervisor/status",
        },
        template,
        readiness: config.readiness.clone(),
        api_timeout: config.api_timeout(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_only_carries_configured_values() {
        let mut config = Config::default();
        config.legacy.ttl_minutes = Some(30);
        config.legacy.no_proxy = Some("localhost".to_string());

        let spec = profile(&config).template.instantiate("sandbox-00000000");
        assert_eq!(spec.image, "simpleyyt/manus-sandbox");
        assert_eq!(
            spec.env_list(),
            vec!["NO_PROXY=localhost", "SERVICE_TIMEOUT_MINUTES=30"]
        );
        assert!(spec.publish.is_empty());
        assert!(spec.binds.is_empty());
    }

    #[test]
    fn test_routes_never_fall_back() {
        let routes = profile(&Config::default()).routes;
        for plan in [routes.exec, routes.file_write, routes.file_download] {
            assert!(plan.fallback.is_none(), "{} has a fallback", plan.label);
            assert!(plan.primary.path.starts_with("/api/v1/"));
        }
    }

    #[test]
    fn test_custom_prefix_decides_ownership() {
        let mut config = Config::default();
        config.legacy.name_prefix = "manus".to_string();
        let profile = profile(&config);
        assert!(profile.owns_name("manus-1a2b3c4d"));
        assert!(!profile.owns_name("sandbox-1a2b3c4d"));
        assert_eq!(profile.placeholder_id(), "legacy-sandbox-dev");
    }
}
