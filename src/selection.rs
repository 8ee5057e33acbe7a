//! Variant selection for the rest of the backend.
//!
//! One [`SelectionService`] is built at startup and shared through an
//! `Arc`; handlers and commands never construct providers themselves.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::sandbox::factory::SandboxFactory;
use crate::sandbox::{Sandbox, SandboxError, SandboxKind, SandboxProvider};

/// Outcome of a throwaway-sandbox health probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub is_healthy: bool,
    pub response_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

pub struct SelectionService {
    factory: SandboxFactory,
}

impl SelectionService {
    pub fn new(config: Arc<Config>) -> Self {
        info!(
            "Sandbox selection initialized with AIO enabled: {}",
            config.aio.enabled
        );
        Self {
            factory: SandboxFactory::new(config),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_runtime(
        config: Arc<Config>,
        runtime: Arc<dyn crate::sandbox::runtime::ContainerRuntime>,
    ) -> Self {
        Self {
            factory: SandboxFactory::with_runtime(config, runtime),
        }
    }

    fn resolve(&self, kind: Option<SandboxKind>) -> SandboxKind {
        kind.unwrap_or_else(|| self.default_kind())
    }

    /// Provider wired for `kind`, or for the default variant.
    pub(crate) fn sandbox_class(&self, kind: Option<SandboxKind>) -> Arc<dyn SandboxProvider> {
        let kind = self.resolve(kind);
        debug!("Selected {} sandbox", kind);
        self.factory.provider(kind)
    }

    pub fn default_kind(&self) -> SandboxKind {
        self.factory.default_kind()
    }

    pub fn is_aio_enabled(&self) -> bool {
        self.factory.is_aio_enabled()
    }

    pub(crate) async fn create_sandbox(
        &self,
        kind: Option<SandboxKind>,
    ) -> Result<Arc<dyn Sandbox>, SandboxError> {
        match kind {
            Some(kind) => self.factory.create_sandbox(kind).await,
            None => self.factory.create_default_sandbox().await,
        }
    }

    pub(crate) async fn get_sandbox(
        &self,
        id: &str,
        kind: Option<SandboxKind>,
    ) -> Result<Arc<dyn Sandbox>, SandboxError> {
        match kind {
            Some(kind) => self.factory.get_sandbox(id, kind).await,
            None => self.factory.get_default_sandbox(id).await,
        }
    }

    /// Checks that `kind` may be used. Nothing is stored.
    pub fn validate_preference(&self, kind: SandboxKind) -> Result<SandboxKind, SandboxError> {
        match kind {
            SandboxKind::Aio if !self.is_aio_enabled() => {
                Err(SandboxError::VariantDisabled { kind })
            }
            _ => Ok(kind),
        }
    }

    /// Provisions a throwaway sandbox, waits for readiness and destroys it.
    ///
    /// Never fails: provisioning and readiness errors are reported in the
    /// returned [`HealthReport`]. A sandbox that never became ready is
    /// unhealthy whatever the readiness policy says.
    pub async fn check_health(&self, kind: Option<SandboxKind>) -> HealthReport {
        let kind = self.resolve(kind);
        let started = Instant::now();

        let outcome = match self.sandbox_class(Some(kind)).create().await {
            Ok(sandbox) => {
                let ready = sandbox.verify_ready().await;
                if !sandbox.destroy().await {
                    warn!("Failed to clean up health-check sandbox {}", sandbox.id());
                }
                ready
            }
            Err(e) => Err(e),
        };

        let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(()) => {
                info!(
                    "Sandbox health check passed for {} in {:.2}ms",
                    kind, response_time_ms
                );
                HealthReport {
                    is_healthy: true,
                    response_time_ms,
                    error_message: None,
                }
            }
            Err(e) => {
                error!("Sandbox health check failed for {}: {}", kind, e);
                HealthReport {
                    is_healthy: false,
                    response_time_ms,
                    error_message: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::runtime::testing::RecordingRuntime;
    use serde_json::json;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(config: Config, runtime: &Arc<RecordingRuntime>) -> SelectionService {
        SelectionService::with_runtime(Arc::new(config), runtime.clone())
    }

    fn fast_config(server: &MockServer) -> Config {
        let mut config = Config::default();
        config.legacy.ports.api = server.address().port();
        config.aio.ports.api = server.address().port();
        config.readiness.max_attempts = 2;
        config.readiness.interval_ms = 10;
        config
    }

    #[test]
    fn test_sandbox_class_is_distinct_per_kind() {
        let runtime = Arc::new(RecordingRuntime::new("127.0.0.1"));
        let service = service(Config::default(), &runtime);

        let legacy = service.sandbox_class(Some(SandboxKind::Legacy));
        let aio = service.sandbox_class(Some(SandboxKind::Aio));
        assert_eq!(legacy.kind(), SandboxKind::Legacy);
        assert_eq!(aio.kind(), SandboxKind::Aio);
        assert!(!Arc::ptr_eq(&legacy, &aio));

        let default = service.sandbox_class(None);
        assert!(Arc::ptr_eq(&default, &service.sandbox_class(Some(service.default_kind()))));
    }

    #[test]
    fn test_validate_preference() {
        let runtime = Arc::new(RecordingRuntime::new("127.0.0.1"));
        let disabled = service(Config::default(), &runtime);
        assert_eq!(
            disabled.validate_preference(SandboxKind::Legacy).unwrap(),
            SandboxKind::Legacy
        );
        let err = disabled.validate_preference(SandboxKind::Aio).unwrap_err();
        assert!(err.is_configuration());
        assert!(runtime.launched().is_empty());

        let mut config = Config::default();
        config.aio.enabled = true;
        let enabled = service(config, &runtime);
        assert!(enabled.validate_preference(SandboxKind::Aio).is_ok());
    }

    #[tokio::test]
    async fn test_health_check_reports_healthy_and_cleans_up() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/supervisor/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [{ "name": "api", "statename": "RUNNING" }]
            })))
            .mount(&server)
            .await;

        let runtime = Arc::new(RecordingRuntime::new("127.0.0.1"));
        let service = service(fast_config(&server), &runtime);

        let report = service.check_health(None).await;
        assert!(report.is_healthy);
        assert!(report.response_time_ms >= 0.0);
        assert!(report.error_message.is_none());

        let launched = runtime.launched();
        assert_eq!(launched.len(), 1);
        assert_eq!(runtime.removed(), vec![launched[0].name.clone()]);
    }

    #[tokio::test]
    async fn test_health_check_reports_unhealthy_and_cleans_up_once() {
        let server = MockServer::start().await;
        Mock::given(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "starting" })))
            .mount(&server)
            .await;

        let runtime = Arc::new(RecordingRuntime::new("127.0.0.1"));
        let service = service(fast_config(&server), &runtime);

        let report = service.check_health(Some(SandboxKind::Aio)).await;
        assert!(!report.is_healthy);
        assert!(report
            .error_message
            .unwrap()
            .contains("failed to become healthy after 2 attempts"));
        assert_eq!(runtime.removed().len(), 1);
    }

    #[tokio::test]
    async fn test_health_check_unhealthy_under_permissive_readiness() {
        let server = MockServer::start().await;
        Mock::given(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "starting" })))
            .mount(&server)
            .await;

        let runtime = Arc::new(RecordingRuntime::new("127.0.0.1"));
        let mut config = fast_config(&server);
        config.readiness.strict = false;
        let service = service(config, &runtime);

        let report = service.check_health(Some(SandboxKind::Aio)).await;
        assert!(!report.is_healthy);
        assert!(report.error_message.is_some());
        assert_eq!(runtime.removed().len(), 1);
    }

    #[tokio::test]
    async fn test_health_check_reports_provisioning_failure() {
        let runtime = Arc::new(RecordingRuntime::failing());
        let service = service(Config::default(), &runtime);

        let report = service.check_health(None).await;
        assert!(!report.is_healthy);
        assert!(report.error_message.unwrap().contains("image not found"));
        assert!(runtime.removed().is_empty());
    }
}
