//! Prompt Iteration Assistant CLI
//!
//! Main entry point for the `pia` command-line tool.
//! Inspects, renders and converts prompt documents stored in a workspace.

mod commands;

use clap::{Parser, Subcommand};
use commands::{ConvertCommand, ListCommand, RenderCommand, ShowCommand, VarsCommand};
use pia_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Prompt Iteration Assistant - compile and convert prompt documents
#[derive(Parser, Debug)]
#[command(name = "pia")]
#[command(about = "Compile, inspect and convert prompt documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "PIA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "PIA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List prompts in the workspace
    List(ListCommand),

    /// Print a prompt's template as an instruct document
    Show(ShowCommand),

    /// List the variables a prompt uses
    Vars(VarsCommand),

    /// Compile a prompt with variables
    Render(RenderCommand),

    /// Convert between instruct text and message JSON
    Convert(ConvertCommand),
}

fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Explicit workspace / config file decide which YAML gets read
    let config = AppConfig::load_from(cli.workspace, cli.config)?;

    // Apply CLI overrides
    let config = config.with_overrides(cli.log_level, cli.verbose, cli.no_color);

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_format)?;

    tracing::info!("pia starting");
    tracing::debug!("Workspace: {:?}", config.workspace);

    let command_name = match &cli.command {
        Commands::List(_) => "list",
        Commands::Show(_) => "show",
        Commands::Vars(_) => "vars",
        Commands::Render(_) => "render",
        Commands::Convert(_) => "convert",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::List(cmd) => cmd.execute(&config),
        Commands::Show(cmd) => cmd.execute(&config),
        Commands::Vars(cmd) => cmd.execute(&config),
        Commands::Render(cmd) => cmd.execute(&config),
        Commands::Convert(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
