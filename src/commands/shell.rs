//! Inspect and drive the process running in a sandbox shell session.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::{report, Target};
use crate::selection::SelectionService;

/// Subcommands of `sandbox-router shell`.
#[derive(Debug, Clone, Subcommand)]
pub enum ShellCommands {
    /// Show a session's output so far
    View(ViewArgs),

    /// Wait for a session's running process to finish
    Wait(WaitArgs),

    /// Send input to a session's running process
    Write(WriteArgs),

    /// Kill a session's running process
    Kill(SessionArgs),
}

/// Shell session of an existing sandbox.
#[derive(Debug, Clone, Args)]
pub struct SessionArgs {
    #[command(flatten)]
    pub target: Target,

    /// Shell session
    #[arg(short, long, default_value = "default")]
    pub session: String,
}

#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Show the console view instead of the plain output
    #[arg(long)]
    pub console: bool,
}

#[derive(Debug, Clone, Args)]
pub struct WaitArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Give up after this many seconds (default: server decides)
    #[arg(long)]
    pub seconds: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct WriteArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Text to send
    pub input: String,

    /// Do not press Enter after the input
    #[arg(long)]
    pub no_enter: bool,
}

impl ShellCommands {
    fn session(&self) -> &SessionArgs {
        match self {
            Self::View(args) => &args.session,
            Self::Wait(args) => &args.session,
            Self::Write(args) => &args.session,
            Self::Kill(args) => args,
        }
    }
}

pub async fn run(selection: &SelectionService, command: &ShellCommands) -> Result<()> {
    let session = command.session();
    let sandbox = session.target.attach(selection).await?;
    let id = session.session.as_str();

    let result = match command {
        ShellCommands::View(args) => sandbox.view_shell(id, args.console).await,
        ShellCommands::Wait(args) => sandbox.wait_for_process(id, args.seconds).await,
        ShellCommands::Write(args) => {
            sandbox
                .write_to_process(id, &args.input, !args.no_enter)
                .await
        }
        ShellCommands::Kill(_) => sandbox.kill_process(id).await,
    };
    report(&result)
}
