//! Sandbox capability interface and its Docker-backed implementations.
//!
//! Two variants share one contract:
//! - `legacy`: the original sandbox image, `/api/v1/...` routes only
//! - `aio`: the all-in-one image, `/api/v1/...` routes with a native
//!   `/v1/...` fallback shape
//!
//! Variants are selected by [`SandboxKind`] through the [`factory`].

mod aio;
mod api;
pub(crate) mod browser;
mod docker;
mod error;
mod external;
pub(crate) mod factory;
mod handle;
mod legacy;
mod network;
mod profile;
mod provider;
mod readiness;
mod resolver;
mod result;
pub(crate) mod runtime;

pub(crate) use browser::BrowserHandle;
pub(crate) use error::SandboxError;
pub(crate) use result::ToolResult;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;

/// Supported sandbox variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxKind {
    /// Original Docker sandbox.
    #[default]
    Legacy,
    /// All-in-one sandbox with the richer API.
    Aio,
}

impl SandboxKind {
    /// Every variant, in display order.
    pub const ALL: [SandboxKind; 2] = [SandboxKind::Legacy, SandboxKind::Aio];

    /// Wire name of the variant.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Aio => "aio",
        }
    }
}

impl std::fmt::Display for SandboxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SandboxKind {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "aio" => Ok(Self::Aio),
            _ => Err(SandboxError::unsupported_kind(s)),
        }
    }
}

/// Options for [`Sandbox::file_write`].
#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct FileWrite {
    pub file: String,
    pub content: String,
    pub append: bool,
    pub leading_newline: bool,
    pub trailing_newline: bool,
    pub sudo: bool,
}

impl FileWrite {
    /// Overwrite `file` with `content`.
    pub fn new(file: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Options for [`Sandbox::file_read`]. Line bounds are passed through as-is.
#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct FileRead {
    pub file: String,
    pub start_line: Option<u64>,
    pub end_line: Option<u64>,
    pub sudo: bool,
}

impl FileRead {
    /// Read the whole of `file`.
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }
}

/// Capability surface shared by every sandbox variant.
///
/// Shell, process and file operations never return `Err`: transport and
/// protocol failures come back as a [`ToolResult`] with `success == false`.
/// Readiness and download do return errors, since their callers need to tell
/// "unusable sandbox" apart from "operation failed".
#[async_trait]
pub(crate) trait Sandbox: Send + Sync {
    /// Container name, or a placeholder for externally managed sandboxes.
    fn id(&self) -> &str;

    /// Variant backing this sandbox.
    fn kind(&self) -> SandboxKind;

    /// Base URL of the control API.
    fn base_url(&self) -> &str;

    /// Remote desktop address.
    fn vnc_url(&self) -> &str;

    /// Browser debugging protocol address.
    fn cdp_url(&self) -> &str;

    /// Polls the sandbox until it reports healthy.
    ///
    /// With a permissive readiness policy, running out of attempts is
    /// logged and treated as ready.
    async fn ensure_ready(&self) -> Result<(), SandboxError>;

    /// Polls like [`ensure_ready`](Self::ensure_ready), but running out of
    /// attempts is always an error.
    async fn verify_ready(&self) -> Result<(), SandboxError>;

    // ── Shell ───────────────────────────────────────────────────

    async fn exec_command(&self, session_id: &str, exec_dir: &str, command: &str) -> ToolResult;
    async fn view_shell(&self, session_id: &str, console: bool) -> ToolResult;
    async fn wait_for_process(&self, session_id: &str, seconds: Option<u64>) -> ToolResult;
    async fn write_to_process(&self, session_id: &str, input: &str, press_enter: bool)
        -> ToolResult;
    async fn kill_process(&self, session_id: &str) -> ToolResult;

    // ── Files ───────────────────────────────────────────────────

    async fn file_write(&self, request: FileWrite) -> ToolResult;
    async fn file_read(&self, request: FileRead) -> ToolResult;
    async fn file_exists(&self, path: &str) -> ToolResult;
    async fn file_delete(&self, path: &str) -> ToolResult;
    async fn file_list(&self, path: &str) -> ToolResult;
    async fn file_replace(&self, file: &str, old_str: &str, new_str: &str, sudo: bool)
        -> ToolResult;
    async fn file_search(&self, file: &str, regex: &str, sudo: bool) -> ToolResult;
    async fn file_find(&self, path: &str, glob: &str) -> ToolResult;
    async fn file_upload(&self, data: Bytes, path: &str, filename: Option<&str>) -> ToolResult;

    /// Downloads `path` as a seekable in-memory stream.
    async fn file_download(&self, path: &str) -> Result<Cursor<Bytes>, SandboxError>;

    // ── Ancillary ───────────────────────────────────────────────

    /// Browser automation handle bound to this sandbox's debugging endpoint.
    fn browser(&self) -> BrowserHandle;

    /// Tears the sandbox down. Errors are logged and reported as `false`.
    ///
    /// Calling it again after a teardown is a no-op that returns `true`.
    async fn destroy(&self) -> bool;
}

/// Creates and attaches sandboxes of one variant.
#[async_trait]
pub(crate) trait SandboxProvider: Send + Sync {
    /// Variant this provider produces.
    fn kind(&self) -> SandboxKind;

    /// Provisions a fresh sandbox.
    async fn create(&self) -> Result<Arc<dyn Sandbox>, SandboxError>;

    /// Attaches to an existing sandbox by identifier.
    async fn get(&self, id: &str) -> Result<Arc<dyn Sandbox>, SandboxError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(format!("{}", SandboxKind::Legacy), "legacy");
        assert_eq!(format!("{}", SandboxKind::Aio), "aio");
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("legacy".parse::<SandboxKind>().unwrap(), SandboxKind::Legacy);
        assert_eq!("aio".parse::<SandboxKind>().unwrap(), SandboxKind::Aio);
        assert_eq!("AIO".parse::<SandboxKind>().unwrap(), SandboxKind::Aio);
        let err = "docker".parse::<SandboxKind>().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("docker"));
    }

    #[test]
    fn test_kind_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&SandboxKind::Aio).unwrap(), "\"aio\"");
        let kind: SandboxKind = serde_json::from_str("\"legacy\"").unwrap();
        assert_eq!(kind, SandboxKind::Legacy);
    }

    #[test]
    fn test_file_write_defaults_to_overwrite() {
        let req = FileWrite::new("/tmp/a.txt", "hi");
        assert!(!req.append);
        assert!(!req.sudo);
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["file"], "/tmp/a.txt");
        assert_eq!(body["trailing_newline"], false);
    }

    #[test]
    fn test_file_read_serializes_null_bounds() {
        let body = serde_json::to_value(FileRead::new("/etc/hosts")).unwrap();
        assert!(body["start_line"].is_null());
        assert!(body["end_line"].is_null());
    }
}
