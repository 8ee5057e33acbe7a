//! Domain-specific error types for sandbox operations.
//!
//! Typed errors let the HTTP layer tell configuration mistakes apart from
//! provisioning failures without parsing message strings. Shell and file
//! operations never produce these; they fold failures into a `ToolResult`.

use std::time::Duration;

use super::SandboxKind;

/// Errors that can occur during sandbox selection and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The requested variant tag is not one of the known variants.
    #[error("Unsupported sandbox type: {tag}")]
    UnsupportedKind { tag: String },

    /// The requested variant exists but is disabled in configuration.
    #[error("{kind} sandbox is not enabled in configuration")]
    VariantDisabled { kind: SandboxKind },

    /// Docker daemon is not running or not accessible.
    #[error("Docker is not available: {message}")]
    DockerUnavailable { message: String },

    /// Container creation, start or inspection failed.
    #[error("Failed to provision sandbox: {message}")]
    Provision { message: String },

    /// No container exists with the given identifier.
    #[error("Sandbox not found: {id}")]
    NotFound { id: String },

    /// Readiness polling exhausted its retry budget.
    #[error("Sandbox failed to become healthy after {attempts} attempts ({waited_secs} seconds)")]
    ReadinessTimeout { attempts: u32, waited_secs: u64 },

    /// File download failed on every route.
    #[error("File download failed: {message}")]
    Download { message: String },

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

impl SandboxError {
    /// Creates an `UnsupportedKind` error.
    pub fn unsupported_kind(tag: impl Into<String>) -> Self {
        Self::UnsupportedKind { tag: tag.into() }
    }

    /// Creates a `DockerUnavailable` error.
    pub fn docker_unavailable(message: impl Into<String>) -> Self {
        Self::DockerUnavailable {
            message: message.into(),
        }
    }

    /// Creates a `Provision` error.
    pub fn provision(message: impl Into<String>) -> Self {
        Self::Provision {
            message: message.into(),
        }
    }

    /// Creates a `NotFound` error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates a `ReadinessTimeout` error from the attempt count and the
    /// interval slept between attempts. No sleep follows the last attempt.
    pub fn readiness_timeout(attempts: u32, interval: Duration) -> Self {
        Self::ReadinessTimeout {
            attempts,
            waited_secs: interval
                .saturating_mul(attempts.saturating_sub(1))
                .as_secs(),
        }
    }

    /// Creates a `Download` error.
    pub fn download(message: impl Into<String>) -> Self {
        Self::Download {
            message: message.into(),
        }
    }

    /// Creates a `Config` error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true for errors caused by the caller's choice of variant.
    ///
    /// These map to client errors on the HTTP surface and are never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedKind { .. } | Self::VariantDisabled { .. }
        )
    }

    /// Returns true if readiness polling gave up.
    pub fn is_readiness_timeout(&self) -> bool {
        matches!(self, Self::ReadinessTimeout { .. })
    }

    /// Returns true if the Docker daemon could not be reached.
    #[allow(dead_code)] // Public API for callers
    pub fn is_docker_unavailable(&self) -> bool {
        matches!(self, Self::DockerUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_kind_error() {
        let err = SandboxError::unsupported_kind("firecracker");
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Unsupported sandbox type: firecracker");
    }

    #[test]
    fn test_variant_disabled_error() {
        let err = SandboxError::VariantDisabled {
            kind: SandboxKind::Aio,
        };
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "aio sandbox is not enabled in configuration");
    }

    #[test]
    fn test_readiness_timeout_error() {
        let err = SandboxError::readiness_timeout(30, Duration::from_secs(2));
        assert!(err.is_readiness_timeout());
        assert!(!err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Sandbox failed to become healthy after 30 attempts (58 seconds)"
        );
    }

    #[test]
    fn test_readiness_timeout_saturates() {
        let err = SandboxError::readiness_timeout(u32::MAX, Duration::MAX);
        assert!(matches!(
            err,
            SandboxError::ReadinessTimeout { waited_secs: u64::MAX, .. }
        ));
        let single = SandboxError::readiness_timeout(1, Duration::from_secs(2));
        assert!(single.to_string().contains("(0 seconds)"));
    }

    #[test]
    fn test_provision_error() {
        let err = SandboxError::provision("image pull denied");
        assert!(!err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Failed to provision sandbox: image pull denied"
        );
    }

    #[test]
    fn test_docker_unavailable_error() {
        let err = SandboxError::docker_unavailable("daemon not running");
        assert!(err.is_docker_unavailable());
        assert_eq!(
            err.to_string(),
            "Docker is not available: daemon not running"
        );
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SandboxError>();
    }
}
