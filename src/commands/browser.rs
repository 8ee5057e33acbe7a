//! Show how to attach automation to a sandbox's browser.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::Target;
use crate::sandbox::browser::BrowserVersion;
use crate::selection::SelectionService;

#[derive(Debug, Clone, Args)]
pub struct BrowserArgs {
    #[command(flatten)]
    pub target: Target,

    /// Print only the websocket debugger URL
    #[arg(long)]
    pub ws: bool,
}

/// Format the browser's version document for a terminal
pub fn format_browser(cdp_url: &str, version: &BrowserVersion) -> String {
    let rule = "━".repeat(50).dimmed();
    let mut out = format!("\n{rule}\n{}\n{rule}\n", "   Browser".yellow().bold());
    out.push_str(&format!("  CDP:        {}\n", cdp_url.cyan()));
    out.push_str(&format!("  Browser:    {}\n", version.browser));
    out.push_str(&format!("  Protocol:   {}\n", version.protocol_version));
    out.push_str(&format!(
        "  WebSocket:  {}\n",
        version.web_socket_debugger_url.cyan()
    ));
    out.push_str(&format!("{rule}\n"));
    out
}

pub async fn run(selection: &SelectionService, args: &BrowserArgs) -> Result<()> {
    let sandbox = args.target.attach(selection).await?;
    let browser = sandbox.browser();

    if args.ws {
        let url = browser
            .websocket_debugger_url()
            .await
            .with_context(|| format!("Failed to query browser of sandbox {}", sandbox.id()))?;
        println!("{url}");
        return Ok(());
    }

    let version = browser
        .version()
        .await
        .with_context(|| format!("Failed to query browser of sandbox {}", sandbox.id()))?;
    print!("{}", format_browser(browser.cdp_url(), &version));
    Ok(())
}
