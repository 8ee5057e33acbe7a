//! Request and response bodies of the HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::sandbox::SandboxKind;

/// Envelope wrapping every response: `{code, msg, data}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub msg: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "success".to_string(),
            data: Some(data),
        }
    }
}

/// Preferred variant. Kept as a string so unknown tags are a 400.
#[derive(Debug, Deserialize)]
pub struct SandboxTypeRequest {
    pub sandbox_type: String,
}

#[derive(Debug, Serialize)]
pub struct SandboxTypeResponse {
    pub sandbox_type: SandboxKind,
    pub available_types: Vec<SandboxKind>,
    pub aio_enabled: bool,
}

impl SandboxTypeResponse {
    pub fn new(default: SandboxKind, aio_enabled: bool) -> Self {
        Self {
            sandbox_type: default,
            available_types: SandboxKind::ALL.to_vec(),
            aio_enabled,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SandboxStatusResponse {
    pub sandbox_id: String,
    pub sandbox_type: SandboxKind,
    pub status: String,
    pub base_url: String,
    pub vnc_url: String,
    pub cdp_url: String,
}

/// `?sandbox_type=` query. Kept as a string so unknown tags are a 400.
#[derive(Debug, Default, Deserialize)]
pub struct KindQuery {
    pub sandbox_type: Option<String>,
}

/// Static feature comparison plus the live selection flags.
pub fn variant_comparison(current_default: SandboxKind, aio_available: bool) -> Value {
    json!({
        "legacy": {
            "name": "Legacy Docker Sandbox",
            "description": "Original sandbox implementation",
            "features": [
                "File system operations",
                "Shell command execution",
                "Browser automation (CDP)",
                "VNC remote desktop",
                "Process management"
            ],
            "advantages": [
                "Stable and tested",
                "Full compatibility",
                "Lower resource usage"
            ],
            "limitations": [
                "Limited tool ecosystem",
                "No built-in development tools",
                "Older technology stack"
            ]
        },
        "aio": {
            "name": "AIO Sandbox",
            "description": "Enhanced sandbox with MCP protocol support",
            "features": [
                "All legacy features",
                "MCP (Model Context Protocol) support",
                "Chrome DevTools Protocol",
                "Built-in Jupyter notebook",
                "VSCode Server integration",
                "Enhanced development tools",
                "Modern container environment"
            ],
            "advantages": [
                "Rich tool ecosystem",
                "Standard protocols (MCP, CDP)",
                "Better development experience",
                "Active development"
            ],
            "limitations": [
                "Higher resource usage",
                "Newer technology (less tested)",
                "Larger container image"
            ]
        },
        "current_default": current_default,
        "aio_available": aio_available,
    })
}
