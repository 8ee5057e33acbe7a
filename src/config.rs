use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "sandbox-router.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the HTTP surface listens on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Client-wide timeout for control-API requests
    #[serde(default = "default_api_timeout")]
    pub api_timeout_secs: u64,

    /// Fixed address of an externally managed sandbox.
    /// When set, no containers are provisioned or removed.
    #[serde(default)]
    pub sandbox_address: Option<String>,

    /// Docker network new sandbox containers join
    #[serde(default)]
    pub sandbox_network: Option<String>,

    /// Maximum distinct hostnames kept by the resolver cache
    #[serde(default = "default_cache_size")]
    pub resolver_cache_size: usize,

    /// Maximum attached sandboxes kept per variant
    #[serde(default = "default_cache_size")]
    pub instance_cache_size: usize,

    #[serde(default)]
    pub legacy: LegacyConfig,

    #[serde(default)]
    pub aio: AioConfig,

    #[serde(default)]
    pub readiness: ReadinessConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// File the configuration was read from
    #[serde(skip)]
    pub source: Option<PathBuf>,

    /// Environment variables that were applied on top of the file
    #[serde(skip)]
    pub env_overrides: Vec<&'static str>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            api_timeout_secs: default_api_timeout(),
            sandbox_address: None,
            sandbox_network: None,
            resolver_cache_size: default_cache_size(),
            instance_cache_size: default_cache_size(),
            legacy: LegacyConfig::default(),
            aio: AioConfig::default(),
            readiness: ReadinessConfig::default(),
            logging: LoggingConfig::default(),
            source: None,
            env_overrides: Vec::new(),
        }
    }
}

/// Container ports of a sandbox's services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortsConfig {
    /// Control API
    #[serde(default = "default_api_port")]
    pub api: u16,

    /// Remote desktop (VNC over websocket)
    #[serde(default = "default_vnc_port")]
    pub vnc: u16,

    /// Browser debugging protocol
    #[serde(default = "default_cdp_port")]
    pub cdp: u16,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            api: default_api_port(),
            vnc: default_vnc_port(),
            cdp: default_cdp_port(),
        }
    }
}

/// Original sandbox image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyConfig {
    #[serde(default = "default_legacy_image")]
    pub image: String,

    /// Container names are `<prefix>-<8 hex>`
    #[serde(default = "default_legacy_prefix")]
    pub name_prefix: String,

    /// Idle minutes before the sandbox shuts its services down
    #[serde(default)]
    pub ttl_minutes: Option<u32>,

    /// Extra arguments for the sandbox's Chrome
    #[serde(default)]
    pub chrome_args: Option<String>,

    #[serde(default)]
    pub https_proxy: Option<String>,

    #[serde(default)]
    pub http_proxy: Option<String>,

    #[serde(default)]
    pub no_proxy: Option<String>,

    /// The legacy image serves VNC through websockify on 5901
    #[serde(default = "default_legacy_ports")]
    pub ports: PortsConfig,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            image: default_legacy_image(),
            name_prefix: default_legacy_prefix(),
            ttl_minutes: None,
            chrome_args: None,
            https_proxy: None,
            http_proxy: None,
            no_proxy: None,
            ports: default_legacy_ports(),
        }
    }
}

/// All-in-one sandbox image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AioConfig {
    /// Allow the aio variant and make it the default
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_aio_image")]
    pub image: String,

    #[serde(default = "default_aio_prefix")]
    pub name_prefix: String,

    /// Page the sandbox browser opens on start
    #[serde(default = "default_homepage")]
    pub homepage: String,

    /// Additional container environment, merged over the built-in values
    #[serde(default)]
    pub extra_env: BTreeMap<String, String>,

    #[serde(default)]
    pub ports: PortsConfig,
}

impl Default for AioConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            image: default_aio_image(),
            name_prefix: default_aio_prefix(),
            homepage: default_homepage(),
            extra_env: BTreeMap::new(),
            ports: PortsConfig::default(),
        }
    }
}

/// Readiness polling after a sandbox is provisioned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between attempts
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Timeout of a single health request
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    /// Fail with a readiness timeout when attempts run out.
    /// When false, exhaustion is only logged.
    #[serde(default = "default_true")]
    pub strict: bool,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            strict: true,
        }
    }
}

impl ReadinessConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,

    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_api_timeout() -> u64 {
    600
}

fn default_cache_size() -> usize {
    128
}

fn default_api_port() -> u16 {
    8080
}

fn default_vnc_port() -> u16 {
    5900
}

fn default_cdp_port() -> u16 {
    9222
}

fn default_legacy_ports() -> PortsConfig {
    PortsConfig {
        vnc: 5901,
        ..PortsConfig::default()
    }
}

fn default_legacy_image() -> String {
    "simpleyyt/manus-sandbox".to_string()
}

fn default_legacy_prefix() -> String {
    "sandbox".to_string()
}

fn default_aio_image() -> String {
    "ghcr.io/agent-infra/sandbox:latest".to_string()
}

fn default_aio_prefix() -> String {
    "aio-sandbox".to_string()
}

fn default_homepage() -> String {
    "https://example.com".to_string()
}

fn default_max_attempts() -> u32 {
    30
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_attempt_timeout_ms() -> u64 {
    5000
}

impl Config {
    /// Load configuration, using defaults when no file is found.
    ///
    /// An explicit `path` must exist. Otherwise `sandbox-router.toml` in the
    /// working directory is tried, then the user config directory.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::discover() {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no component can work with.
    pub fn validate(&self) -> Result<()> {
        if self.resolver_cache_size == 0 {
            anyhow::bail!("resolver_cache_size must be at least 1");
        }
        if self.instance_cache_size == 0 {
            anyhow::bail!("instance_cache_size must be at least 1");
        }
        Ok(())
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("sandbox-router").join("config.toml"))
            .filter(|path| path.exists())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.source = Some(path.to_path_buf());

        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Empty values are treated as unset. Applied keys are recorded in
    /// `env_overrides`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();
        let mut get = |key: &'static str| {
            let value = lookup(key).filter(|v| !v.trim().is_empty());
            if value.is_some() {
                applied.push(key);
            }
            value
        };

        if let Some(v) = get("AIO_SANDBOX_ENABLED") {
            self.aio.enabled = parse_bool("AIO_SANDBOX_ENABLED", &v)?;
        }
        if let Some(v) = get("AIO_SANDBOX_IMAGE") {
            self.aio.image = v;
        }
        if let Some(v) = get("SANDBOX_IMAGE") {
            self.legacy.image = v;
        }
        if let Some(v) = get("SANDBOX_NAME_PREFIX") {
            self.legacy.name_prefix = v;
        }
        if let Some(v) = get("SANDBOX_ADDRESS") {
            self.sandbox_address = Some(v);
        }
        if let Some(v) = get("SANDBOX_NETWORK") {
            self.sandbox_network = Some(v);
        }
        if let Some(v) = get("SANDBOX_TTL_MINUTES") {
            let minutes = v
                .trim()
                .parse()
                .with_context(|| format!("Invalid SANDBOX_TTL_MINUTES: {v}"))?;
            self.legacy.ttl_minutes = Some(minutes);
        }
        if let Some(v) = get("SANDBOX_CHROME_ARGS") {
            self.legacy.chrome_args = Some(v);
        }
        if let Some(v) = get("SANDBOX_HTTPS_PROXY") {
            self.legacy.https_proxy = Some(v);
        }
        if let Some(v) = get("SANDBOX_HTTP_PROXY") {
            self.legacy.http_proxy = Some(v);
        }
        if let Some(v) = get("SANDBOX_NO_PROXY") {
            self.legacy.no_proxy = Some(v);
        }
        if let Some(v) = get("SANDBOX_READINESS_STRICT") {
            self.readiness.strict = parse_bool("SANDBOX_READINESS_STRICT", &v)?;
        }
        if let Some(v) = get("SANDBOX_ROUTER_BIND") {
            self.bind = v;
        }

        self.env_overrides.extend(applied);
        Ok(())
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("Invalid boolean for {key}: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.aio.enabled);
        assert_eq!(config.aio.image, "ghcr.io/agent-infra/sandbox:latest");
        assert_eq!(config.legacy.image, "simpleyyt/manus-sandbox");
        assert_eq!(config.legacy.ports.vnc, 5901);
        assert_eq!(config.aio.ports.vnc, 5900);
        assert_eq!(config.readiness.max_attempts, 30);
        assert!(config.readiness.strict);
        assert_eq!(config.api_timeout(), Duration::from_secs(600));
        assert!(config.sandbox_address.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
sandbox_address = "sandbox.internal"
sandbox_network = "manus-network"

[aio]
enabled = true
image = "registry.local/sandbox:1.2"

[aio.extra_env]
PROXY_SERVER = "http://proxy:3128"

[legacy]
ttl_minutes = 30

[readiness]
max_attempts = 5
interval_ms = 100
strict = false

[logging]
format = "json"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.aio.enabled);
        assert_eq!(config.aio.image, "registry.local/sandbox:1.2");
        assert_eq!(
            config.aio.extra_env.get("PROXY_SERVER").map(String::as_str),
            Some("http://proxy:3128")
        );
        assert_eq!(config.sandbox_address.as_deref(), Some("sandbox.internal"));
        assert_eq!(config.legacy.ttl_minutes, Some(30));
        assert_eq!(config.readiness.max_attempts, 5);
        assert_eq!(config.readiness.interval(), Duration::from_millis(100));
        assert_eq!(config.readiness.attempt_timeout_ms, 5000);
        assert!(!config.readiness.strict);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.toml");
        fs::write(&path, "bind = \"0.0.0.0:9000\"\n[aio]\nenabled = true\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert!(config.aio.enabled);
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_zero_cache_sizes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.toml");
        fs::write(&path, "instance_cache_size = 0\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("instance_cache_size"));

        let config = Config {
            resolver_cache_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_invalid_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[aio\nenabled = maybe").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("AIO_SANDBOX_ENABLED", "true"),
                ("AIO_SANDBOX_IMAGE", "aio:dev"),
                ("SANDBOX_ADDRESS", "10.1.2.3"),
                ("SANDBOX_NETWORK", "net0"),
                ("SANDBOX_TTL_MINUTES", "45"),
                ("SANDBOX_HTTPS_PROXY", "http://proxy:8443"),
                ("SANDBOX_READINESS_STRICT", "no"),
                ("SANDBOX_ROUTER_BIND", "0.0.0.0:8000"),
            ]))
            .unwrap();

        assert!(config.aio.enabled);
        assert_eq!(config.aio.image, "aio:dev");
        assert_eq!(config.sandbox_address.as_deref(), Some("10.1.2.3"));
        assert_eq!(config.sandbox_network.as_deref(), Some("net0"));
        assert_eq!(config.legacy.ttl_minutes, Some(45));
        assert_eq!(config.legacy.https_proxy.as_deref(), Some("http://proxy:8443"));
        assert!(!config.readiness.strict);
        assert_eq!(config.bind, "0.0.0.0:8000");
        assert_eq!(config.env_overrides.len(), 8);
        assert!(config.env_overrides.contains(&"SANDBOX_NETWORK"));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("SANDBOX_ADDRESS", ""), ("AIO_SANDBOX_ENABLED", " ")]))
            .unwrap();
        assert!(config.sandbox_address.is_none());
        assert!(!config.aio.enabled);
        assert!(config.env_overrides.is_empty());
    }

    #[test]
    fn test_invalid_env_values_fail() {
        let mut config = Config::default();
        assert!(config
            .apply_env(env(&[("AIO_SANDBOX_ENABLED", "sometimes")]))
            .is_err());
        assert!(config
            .apply_env(env(&[("SANDBOX_TTL_MINUTES", "soon")]))
            .is_err());
    }
}
