use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

mod commands;
mod config;
mod sandbox;
mod selection;
mod server;

use commands::browser::BrowserArgs;
use commands::exec::ExecArgs;
use commands::file::FileCommands;
use commands::shell::ShellCommands;
use commands::Target;
use config::{Config, LogFormat, LoggingConfig};
use sandbox::factory::SandboxFactory;
use sandbox::SandboxKind;
use selection::SelectionService;

#[derive(Parser)]
#[command(name = "sandbox-router")]
#[command(
    author,
    version,
    about = "Select, provision and proxy legacy and AIO Docker sandboxes"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: ./sandbox-router.toml)
    #[arg(short, long, global = true, env = "SANDBOX_ROUTER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the sandbox HTTP API
    Serve {
        /// Listen address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Provision a throwaway sandbox and check that it becomes ready
    Health {
        /// Sandbox type: legacy or aio (default: from config)
        #[arg(short = 't', long = "type", value_parser = SandboxFactory::parse_kind)]
        kind: Option<SandboxKind>,
    },

    /// Provision a sandbox and wait until it is ready
    Create {
        /// Sandbox type: legacy or aio (default: from config)
        #[arg(short = 't', long = "type", value_parser = SandboxFactory::parse_kind)]
        kind: Option<SandboxKind>,
    },

    /// Show the addresses of an existing sandbox
    Status(Target),

    /// Run a shell command in an existing sandbox
    Exec(ExecArgs),

    /// Inspect or drive a shell session's process
    Shell {
        #[command(subcommand)]
        command: ShellCommands,
    },

    /// Read, write and transfer files
    File {
        #[command(subcommand)]
        command: FileCommands,
    },

    /// Show the browser debugging endpoint of a sandbox
    Browser(BrowserArgs),

    /// Remove a sandbox container
    Destroy(Target),

    /// Compare the sandbox types
    Compare {
        /// Print the raw comparison document
        #[arg(long)]
        json: bool,
    },
}

/// Install the global subscriber. The guard must live until exit so
/// buffered file output is flushed.
fn init_logging(verbose: bool, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("sandbox_router=debug,tower_http=debug")
        } else {
            EnvFilter::new("sandbox_router=info")
        }
    });

    let stderr_layer: Box<dyn Layer<Registry> + Send + Sync> = match logging.format {
        LogFormat::Pretty => fmt::layer().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    let (file_layer, guard) = match &logging.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer()
                .with_ansi(false)
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

/// Reports where the configuration came from. Loading happens before the
/// subscriber exists, so this runs once logging is up.
fn log_config_source(config: &Config) {
    match &config.source {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => debug!("No configuration file found, using defaults"),
    }
    if !config.env_overrides.is_empty() {
        debug!("Environment overrides: {}", config.env_overrides.join(", "));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Arc::new(Config::load(cli.config.as_deref())?);
    let _guard = init_logging(cli.verbose, &config.logging)?;
    log_config_source(&config);

    match cli.command {
        Commands::Serve { bind } => {
            commands::serve::run(config, bind).await?;
        }
        Commands::Health { kind } => {
            let selection = SelectionService::new(config);
            commands::health::run(&selection, kind).await?;
        }
        Commands::Create { kind } => {
            let selection = SelectionService::new(config);
            commands::create::run(&selection, kind).await?;
        }
        Commands::Status(target) => {
            let selection = SelectionService::new(config);
            commands::status::run(&selection, &target).await?;
        }
        Commands::Exec(args) => {
            let selection = SelectionService::new(config);
            commands::exec::run(&selection, &args).await?;
        }
        Commands::Shell { command } => {
            let selection = SelectionService::new(config);
            commands::shell::run(&selection, &command).await?;
        }
        Commands::File { command } => {
            let selection = SelectionService::new(config);
            commands::file::run(&selection, &command).await?;
        }
        Commands::Browser(args) => {
            let selection = SelectionService::new(config);
            commands::browser::run(&selection, &args).await?;
        }
        Commands::Destroy(target) => {
            let selection = SelectionService::new(config);
            commands::destroy::run(&selection, &target).await?;
        }
        Commands::Compare { json } => {
            let selection = SelectionService::new(config);
            commands::compare::run(&selection, json)?;
        }
    }

    Ok(())
}
