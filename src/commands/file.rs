//! File operations against an existing sandbox.

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Args, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

use super::{report, Target};
use crate::sandbox::{FileRead, FileWrite};
use crate::selection::SelectionService;

/// Subcommands of `sandbox-router file`.
#[derive(Debug, Clone, Subcommand)]
pub enum FileCommands {
    /// Print a file, optionally a line range of it
    Read(ReadArgs),

    /// Write a file from an argument or stdin
    Write(WriteArgs),

    /// Check whether a path exists
    Exists(PathArgs),

    /// Delete a file
    Delete(PathArgs),

    /// List a directory
    List(PathArgs),

    /// Replace a string in a file
    Replace(ReplaceArgs),

    /// Search a file with a regular expression
    Search(SearchArgs),

    /// Find files under a directory by glob
    Find(FindArgs),

    /// Upload a local file into the sandbox
    Upload(UploadArgs),

    /// Download a file from the sandbox
    Download(DownloadArgs),
}

#[derive(Debug, Clone, Args)]
pub struct PathArgs {
    #[command(flatten)]
    pub target: Target,

    /// Path inside the sandbox
    pub path: String,
}

#[derive(Debug, Clone, Args)]
pub struct ReadArgs {
    #[command(flatten)]
    pub target: Target,

    /// File inside the sandbox
    pub file: String,

    /// First line to read
    #[arg(long)]
    pub start_line: Option<u64>,

    /// Line to stop at
    #[arg(long)]
    pub end_line: Option<u64>,

    /// Read with elevated privileges
    #[arg(long)]
    pub sudo: bool,
}

#[derive(Debug, Clone, Args)]
pub struct WriteArgs {
    #[command(flatten)]
    pub target: Target,

    /// File inside the sandbox
    pub file: String,

    /// Content to write (default: read from stdin)
    pub content: Option<String>,

    /// Append instead of overwriting
    #[arg(long)]
    pub append: bool,

    /// Prefix the content with a newline
    #[arg(long)]
    pub leading_newline: bool,

    /// End the content with a newline
    #[arg(long)]
    pub trailing_newline: bool,

    /// Write with elevated privileges
    #[arg(long)]
    pub sudo: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ReplaceArgs {
    #[command(flatten)]
    pub target: Target,

    /// File inside the sandbox
    pub file: String,

    /// Text to replace
    pub old_str: String,

    /// Replacement text
    pub new_str: String,

    /// Edit with elevated privileges
    #[arg(long)]
    pub sudo: bool,
}

#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub target: Target,

    /// File inside the sandbox
    pub file: String,

    /// Regular expression to match lines against
    pub regex: String,

    /// Search with elevated privileges
    #[arg(long)]
    pub sudo: bool,
}

#[derive(Debug, Clone, Args)]
pub struct FindArgs {
    #[command(flatten)]
    pub target: Target,

    /// Directory to search under
    pub path: String,

    /// Glob to match file names against
    pub glob: String,
}

#[derive(Debug, Clone, Args)]
pub struct UploadArgs {
    #[command(flatten)]
    pub target: Target,

    /// Local file to send
    pub local: PathBuf,

    /// Destination path inside the sandbox
    pub path: String,

    /// File name to upload as (default: the local file's name)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub target: Target,

    /// File inside the sandbox
    pub path: String,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl FileCommands {
    fn target(&self) -> &Target {
        match self {
            Self::Read(args) => &args.target,
            Self::Write(args) => &args.target,
            Self::Exists(args) | Self::Delete(args) | Self::List(args) => &args.target,
            Self::Replace(args) => &args.target,
            Self::Search(args) => &args.target,
            Self::Find(args) => &args.target,
            Self::Upload(args) => &args.target,
            Self::Download(args) => &args.target,
        }
    }
}

impl WriteArgs {
    fn request(&self, content: String) -> FileWrite {
        FileWrite {
            append: self.append,
            leading_newline: self.leading_newline,
            trailing_newline: self.trailing_newline,
            sudo: self.sudo,
            ..FileWrite::new(&self.file, content)
        }
    }
}

impl ReadArgs {
    fn request(&self) -> FileRead {
        FileRead {
            start_line: self.start_line,
            end_line: self.end_line,
            sudo: self.sudo,
            ..FileRead::new(&self.file)
        }
    }
}

/// Name a local file is uploaded as when none is given.
fn upload_name(args: &UploadArgs) -> Option<String> {
    args.name.clone().or_else(|| {
        args.local
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    })
}

pub async fn run(selection: &SelectionService, command: &FileCommands) -> Result<()> {
    let sandbox = command.target().attach(selection).await?;

    let result = match command {
        FileCommands::Read(args) => sandbox.file_read(args.request()).await,
        FileCommands::Write(args) => {
            let content = match &args.content {
                Some(content) => content.clone(),
                None => {
                    let mut content = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut content)
                        .await
                        .context("Failed to read content from stdin")?;
                    content
                }
            };
            sandbox.file_write(args.request(content)).await
        }
        FileCommands::Exists(args) => sandbox.file_exists(&args.path).await,
        FileCommands::Delete(args) => sandbox.file_delete(&args.path).await,
        FileCommands::List(args) => sandbox.file_list(&args.path).await,
        FileCommands::Replace(args) => {
            sandbox
                .file_replace(&args.file, &args.old_str, &args.new_str, args.sudo)
                .await
        }
        FileCommands::Search(args) => {
            sandbox
                .file_search(&args.file, &args.regex, args.sudo)
                .await
        }
        FileCommands::Find(args) => sandbox.file_find(&args.path, &args.glob).await,
        FileCommands::Upload(args) => {
            let data = tokio::fs::read(&args.local)
                .await
                .with_context(|| format!("Failed to read {}", args.local.display()))?;
            let name = upload_name(args);
            sandbox
                .file_upload(Bytes::from(data), &args.path, name.as_deref())
                .await
        }
        FileCommands::Download(args) => {
            let mut stream = sandbox.file_download(&args.path).await?;
            match &args.output {
                Some(output) => {
                    let mut file = std::fs::File::create(output)
                        .with_context(|| format!("Failed to create {}", output.display()))?;
                    let written = std::io::copy(&mut stream, &mut file)
                        .with_context(|| format!("Failed to write {}", output.display()))?;
                    eprintln!("Downloaded {} bytes to {}", written, output.display());
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    std::io::copy(&mut stream, &mut stdout)?;
                    stdout.flush()?;
                }
            }
            return Ok(());
        }
    };
    report(&result)
}
