//! Run a shell command inside an existing sandbox.

use anyhow::{bail, Result};
use clap::Args;

use super::{report, Target};
use crate::selection::SelectionService;

#[derive(Debug, Clone, Args)]
pub struct ExecArgs {
    #[command(flatten)]
    pub target: Target,

    /// Shell session to run in
    #[arg(short, long, default_value = "default")]
    pub session: String,

    /// Working directory inside the sandbox
    #[arg(short, long, default_value = "/home/ubuntu")]
    pub dir: String,

    /// Command and arguments
    #[arg(trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}

pub async fn run(selection: &SelectionService, args: &ExecArgs) -> Result<()> {
    if args.command.is_empty() {
        bail!("No command given");
    }
    let command = shell_words::join(&args.command);

    let sandbox = args.target.attach(selection).await?;
    let result = sandbox.exec_command(&args.session, &args.dir, &command).await;
    report(&result)
}
