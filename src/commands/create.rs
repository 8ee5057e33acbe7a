//! Provision a sandbox and leave it running.

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::warn;

use super::status::format_sandbox;
use crate::sandbox::SandboxKind;
use crate::selection::SelectionService;

pub async fn run(selection: &SelectionService, kind: Option<SandboxKind>) -> Result<()> {
    let sandbox = selection
        .create_sandbox(kind)
        .await
        .context("Failed to create sandbox")?;

    if let Err(e) = sandbox.ensure_ready().await {
        if !sandbox.destroy().await {
            warn!("Failed to clean up unready sandbox {}", sandbox.id());
        }
        return Err(e).with_context(|| format!("Sandbox {} did not become ready", sandbox.id()));
    }

    print!("{}", format_sandbox(sandbox.as_ref()));
    println!("\n{} Created {}", "✓".green(), sandbox.id().cyan());
    Ok(())
}
