use anyhow::{bail, Result};
use colored::Colorize;

use super::Target;
use crate::selection::SelectionService;

pub async fn run(selection: &SelectionService, target: &Target) -> Result<()> {
    let sandbox = target.attach(selection).await?;

    if !sandbox.destroy().await {
        bail!("Failed to destroy sandbox {}", target.id);
    }

    println!(
        "\n{} Destroyed {} sandbox {}",
        "✓".green(),
        sandbox.kind(),
        target.id.cyan()
    );
    Ok(())
}
