//! CLI command implementations.
//!
//! Each submodule implements one subcommand; output formatting is kept in
//! pure functions where there is any to test.

pub mod browser;
pub mod compare;
pub mod create;
pub mod destroy;
pub mod exec;
pub mod file;
pub mod health;
pub mod serve;
pub mod shell;
pub mod status;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;
use std::sync::Arc;

use crate::sandbox::factory::SandboxFactory;
use crate::sandbox::{Sandbox, SandboxKind, ToolResult};
use crate::selection::SelectionService;

/// Existing sandbox a command operates on.
#[derive(Debug, Clone, Args)]
pub struct Target {
    /// Sandbox container name
    pub id: String,

    /// Sandbox type: legacy or aio (default: from config)
    #[arg(short = 't', long = "type", value_parser = SandboxFactory::parse_kind)]
    pub kind: Option<SandboxKind>,
}

impl Target {
    pub async fn attach(&self, selection: &SelectionService) -> Result<Arc<dyn Sandbox>> {
        selection
            .get_sandbox(&self.id, self.kind)
            .await
            .with_context(|| format!("Failed to get sandbox {}", self.id))
    }
}

/// Render an operation's payload: strings verbatim, anything else as JSON.
pub fn render_output(result: &ToolResult) -> String {
    match &result.data {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) if map.get("output").is_some_and(Value::is_string) => {
            map["output"].as_str().unwrap_or_default().to_string()
        }
        Some(other) => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Print an operation's payload, failing with its message when it failed.
pub fn report(result: &ToolResult) -> Result<()> {
    let output = render_output(result);
    if !output.is_empty() {
        print!("{output}");
        if !output.ends_with('\n') {
            println!();
        }
    }

    if !result.success {
        bail!(
            "{}",
            result.message.as_deref().unwrap_or("Sandbox operation failed")
        );
    }
    if let Some(message) = result.message.as_deref() {
        eprintln!("{message}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_string_payload() {
        assert_eq!(render_output(&ToolResult::ok("hi\n")), "hi\n");
    }

    #[test]
    fn test_render_envelope_output_field() {
        let result = ToolResult::ok(json!({ "output": "total 0\n", "session_id": "s" }));
        assert_eq!(render_output(&result), "total 0\n");
    }

    #[test]
    fn test_render_other_payloads_as_json() {
        let result = ToolResult::ok(json!({ "status": "completed", "returncode": 0 }));
        let out = render_output(&result);
        assert!(out.contains("\"returncode\": 0"));
        assert_eq!(render_output(&ToolResult::failure("x")), "");
    }

    #[test]
    fn test_report_fails_with_message() {
        let err = report(&ToolResult::failure("File write failed: disk full")).unwrap_err();
        assert_eq!(err.to_string(), "File write failed: disk full");
        assert!(report(&ToolResult::ok(json!(null))).is_ok());
    }
}
