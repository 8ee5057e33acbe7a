use anyhow::Result;
use colored::Colorize;

use super::Target;
use crate::sandbox::Sandbox;
use crate::selection::SelectionService;

/// Format a sandbox's addresses as a displayable string
pub fn format_sandbox(sandbox: &dyn Sandbox) -> String {
    let rule = "━".repeat(50).dimmed();
    let mut out = format!(
        "\n{rule}\n{}\n{rule}\n",
        format!("   Sandbox {}", sandbox.id()).yellow().bold()
    );
    out.push_str(&format!("  Type:       {}\n", sandbox.kind().to_string().cyan()));
    out.push_str(&format!("  API:        {}\n", sandbox.base_url().cyan()));
    out.push_str(&format!("  VNC:        {}\n", sandbox.vnc_url().cyan()));
    out.push_str(&format!("  CDP:        {}\n", sandbox.cdp_url().cyan()));
    out.push_str(&format!("{rule}\n"));
    out
}

pub async fn run(selection: &SelectionService, target: &Target) -> Result<()> {
    let sandbox = target.attach(selection).await?;
    print!("{}", format_sandbox(sandbox.as_ref()));
    Ok(())
}
