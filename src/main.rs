use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;

const DEFAULT_LOG_FILTER: &str = "web2app_admin=info,tower_http=info";

#[derive(Parser)]
#[command(name = "web2app-admin")]
#[command(version, about = "Admin API for the Web2App Studio template catalog")]
pub struct Cli {
    /// Path to the config file (defaults to ./web2app.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the admin HTTP API
    Serve {
        /// Port to serve on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable dev mode (permissive CORS, bind 0.0.0.0)
        #[arg(long)]
        dev: bool,

        /// Open the admin login page in a browser once started
        #[arg(long)]
        open: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Fetch and upload icons for every template without one
    Icons {
        /// Report what would be uploaded without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Recompute per-category template counts in the manifest
    Counts,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration (secrets redacted)
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose {
        "web2app_admin=debug,tower_http=debug"
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(web2app_admin::config::DEFAULT_CONFIG_FILE));

    match &cli.command {
        Commands::Serve { port, dev, open } => {
            cmd::cmd_serve(&config_path, *port, *dev, *open).await?;
        }
        Commands::Config { command } => cmd::cmd_config(&config_path, command.clone())?,
        Commands::Icons { dry_run } => cmd::cmd_icons(&config_path, *dry_run).await?,
        Commands::Counts => cmd::cmd_counts(&config_path).await?,
    }

    Ok(())
}
