//! Ringside CLI
//!
//! Log in to the Ringside API, call it with the saved session, and keep that
//! session alive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use ringside_cli::api_cmd;
use ringside_cli::auth_cmd::{self, AuthAction};
use ringside_cli::context::{Context, Overrides, resolve_config};
use ringside_core::Role;
use ringside_core::config::load_config;
use ringside_core::tracing_init::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "ringside")]
#[command(version, about = "Ringside API client", long_about = None)]
struct Cli {
    /// Backend API base URL
    #[arg(long, env = "RINGSIDE_API_URL")]
    api_url: Option<String>,

    /// Directory holding the saved session
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Account and session management
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// GET an API path using the saved session
    Get { path: String },
    /// Keep the session alive and report access until it ends
    Watch {
        /// Role the session must have
        #[arg(long)]
        role: Option<Role>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing("ringside=warn", cli.log_json);

    let config = resolve_config(
        load_config()?,
        Overrides {
            api_url: cli.api_url,
            data_dir: cli.data_dir,
        },
    )?;
    info!(version = env!("CARGO_PKG_VERSION"), api_url = %config.api_url, "Starting ringside CLI");

    let ctx = Context::open(config).await?;
    match cli.command {
        Commands::Auth { action } => auth_cmd::run(action, &ctx).await,
        Commands::Get { path } => api_cmd::get(&ctx, &path).await,
        Commands::Watch { role } => api_cmd::watch(&ctx, role).await,
    }
}
