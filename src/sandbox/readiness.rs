//! Bounded readiness polling.

use serde_json::Value;
use tracing::{error, info, warn};

use super::api::SandboxApi;
use super::error::SandboxError;
use crate::config::ReadinessConfig;

/// How a variant reports that it can take requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadinessProbe {
    /// `{"status": "healthy"}` from a health endpoint.
    HealthStatus { path: &'static str },
    /// Supervisor service list where every service must be `RUNNING`.
    SupervisorRunning { path: &'static str },
}

impl ReadinessProbe {
    pub fn path(&self) -> &'static str {
        match self {
            Self::HealthStatus { path } | Self::SupervisorRunning { path } => path,
        }
    }

    /// Whether `body` reports the sandbox as ready.
    pub fn is_ready(&self, body: &Value) -> bool {
        match self {
            Self::HealthStatus { .. } => body.get("status").and_then(Value::as_str) == Some("healthy"),
            Self::SupervisorRunning { .. } => {
                let services = body
                    .get("data")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                !services.is_empty()
                    && services.iter().all(|service| {
                        service.get("statename").and_then(Value::as_str) == Some("RUNNING")
                    })
            }
        }
    }
}

/// Polls `probe` until it reports ready or `policy.max_attempts` run out.
///
/// Transport and decode errors count as "not ready yet". Exhaustion is
/// always [`SandboxError::ReadinessTimeout`]; whether that is fatal is the
/// caller's decision.
pub(crate) async fn wait_until_ready(
    api: &SandboxApi,
    probe: ReadinessProbe,
    policy: &ReadinessConfig,
) -> Result<(), SandboxError> {
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        match api.get_json(probe.path(), policy.attempt_timeout()).await {
            Ok(body) if probe.is_ready(&body) => {
                info!(
                    "Sandbox at {} is ready (attempt {}/{})",
                    api.base_url(),
                    attempt,
                    attempts
                );
                return Ok(());
            }
            Ok(body) => {
                warn!("Sandbox not ready yet: {} (attempt {}/{})", body, attempt, attempts);
            }
            Err(e) => {
                warn!(
                    "Failed to check sandbox health (attempt {}/{}): {}",
                    attempt, attempts, e
                );
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.interval()).await;
        }
    }

    let err = SandboxError::readiness_timeout(attempts, policy.interval());
    error!("{} at {}", err, api.base_url());
    Err(err)
}
