//! All-in-one sandbox (`ghcr.io/agent-infra/sandbox`).
//!
//! Serves the `/api/v1/...` routes the legacy image does, plus the native
//! `/v1/...` shape each operation falls back to.

use std::collections::BTreeMap;

use super::api::{CallPlan, Replay, Route};
use super::profile::{ContainerTemplate, RouteTable, VariantProfile};
use super::readiness::ReadinessProbe;
use super::runtime::HealthCheck;
use super::SandboxKind;
use crate::config::Config;

const SHM_SIZE: i64 = 2 * 1024 * 1024 * 1024;

const fn pair(label: &'static str, replay: Replay, primary: &'static str, native: &'static str) -> CallPlan {
    CallPlan::with_fallback(label, replay, Route::envelope(primary), Route::envelope(native))
}

static ROUTES: RouteTable = RouteTable {
    exec: CallPlan::with_fallback(
        "Command execution",
        Replay::Unsent,
        Route::envelope("/api/v1/shell/exec"),
        Route::native_shell("/v1/sandbox/shell"),
    ),
    view: pair("Shell view", Replay::Always, "/api/v1/shell/view", "/v1/shell/view"),
    wait: pair("Process wait", Replay::Always, "/api/v1/shell/wait", "/v1/shell/wait"),
    write_input: pair("Process write", Replay::Unsent, "/api/v1/shell/write", "/v1/shell/write"),
    kill: pair("Process kill", Replay::Always, "/api/v1/shell/kill", "/v1/shell/kill"),
    file_write: pair("File write", Replay::Always, "/api/v1/file/write", "/v1/file/write"),
    file_read: pair("File read", Replay::Always, "/api/v1/file/read", "/v1/file/read"),
    file_exists: pair("File exists check", Replay::Always, "/api/v1/file/exists", "/v1/file/exists"),
    file_delete: pair("File delete", Replay::Always, "/api/v1/file/delete", "/v1/file/delete"),
    file_list: pair("File list", Replay::Always, "/api/v1/file/list", "/v1/file/list"),
    file_replace: pair("File replace", Replay::Unsent, "/api/v1/file/replace", "/v1/file/replace"),
    file_search: pair("File search", Replay::Always, "/api/v1/file/search", "/v1/file/search"),
    file_find: pair("File find", Replay::Always, "/api/v1/file/find", "/v1/file/find"),
    file_upload: pair("File upload", Replay::Unsent, "/api/v1/file/upload", "/v1/file/upload"),
    file_download: pair("File download", Replay::Always, "/api/v1/file/download", "/v1/file/download"),
};

pub(crate) fn profile(config: &Config) -> VariantProfile {
    let aio = &config.aio;

    let mut env: BTreeMap<String, String> = [
        ("WORKSPACE", "/home/gem"),
        ("TZ", "UTC"),
        ("PROXY_SERVER", ""),
        ("JWT_PUBLIC_KEY", ""),
        ("DNS_OVER_HTTPS_TEMPLATES", ""),
        ("BROWSER_EXTRA_ARGS", "--disable-gpu"),
        ("WAIT_PORTS", "3000,5000"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    env.insert("HOMEPAGE".to_string(), aio.homepage.clone());
    env.extend(aio.extra_env.clone());

    let template = ContainerTemplate {
        image: aio.image.clone(),
        env,
        volumes: vec![
            ("aio-{name}-workspace".to_string(), "/home/gem/workspace".to_string()),
            ("aio-{name}-shared".to_string(), "/home/gem/shared".to_string()),
        ],
        publish: vec![aio.ports.api, aio.ports.vnc, aio.ports.cdp],
        security_opt: vec!["seccomp:unconfined".to_string()],
        extra_hosts: vec!["host.docker.internal:host-gateway".to_string()],
        shm_size: Some(SHM_SIZE),
        network: config.sandbox_network.clone(),
        healthcheck: Some(HealthCheck {
            test: ["CMD", "curl", "-f", "http://localhost:8080/health"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            interval_ns: 30_000_000_000,
            timeout_ns: 10_000_000_000,
            retries: 3,
        }),
        auto_remove: true,
    };

    VariantProfile {
        kind: SandboxKind::Aio,
        name_prefix: aio.name_prefix.clone(),
        ports: aio.ports,
        routes: &ROUTES,
        probe: ReadinessProbe::HealthStatus { path: "/health" },
        template,
        readiness: config.readiness.clone(),
        api_timeout: config.api_timeout(),
    }
}
