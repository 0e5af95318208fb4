//! armbridge CLI — the main entry point.
//!
//! Commands:
//! - `run`     — Start the peer server, goal listener and control loop
//! - `status`  — Show the effective configuration
//! - `config`  — Show, validate or locate the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "armbridge",
    about = "armbridge — control loop to WebSocket robot bridge",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.armbridge/config.toml)
    #[arg(short, long, global = true, env = "ARMBRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bridge and the control loop
    Run {
        /// Override the peer server host
        #[arg(long)]
        host: Option<String>,

        /// Override the peer server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the goal listener port
        #[arg(short, long)]
        goal_port: Option<u16>,
    },

    /// Show the effective configuration
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Load and validate the configuration
    Validate,
    /// Print the config file path
    Path,
    /// Print the default configuration as TOML
    Default,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run {
            host,
            port,
            goal_port,
        } => {
            let overrides = commands::run::Overrides {
                host,
                port,
                goal_port,
            };
            commands::run::run(config_path, overrides).await?
        }
        Commands::Status => commands::status::run(config_path).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path).await?,
            ConfigAction::Path => commands::config_cmd::path(config_path).await?,
            ConfigAction::Default => commands::config_cmd::default().await?,
        },
    }

    Ok(())
}
