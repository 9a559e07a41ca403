//! sessionctl - inspect and drive the client-side auth session.

mod commands;
mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use session_config::{Config, Paths};
use tracing::debug;

/// sessionctl - Check, resume and end the authenticated session.
#[derive(Parser)]
#[command(name = "sessionctl")]
#[command(about = "Client-side session manager for the auth backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check authentication status with the stored credential
    Status,

    /// Finish a login from the URL the backend redirected to
    Resume {
        /// Full return URL, including `token=` or `auth=success`
        url: String,
    },

    /// Open the login page in the browser
    Login,

    /// Logout and clear the stored credential
    Logout,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let config = Config::load(&paths).context("failed to load configuration")?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    session_config::init_logging(level, &paths);
    debug!(base_dir = %paths.base_dir().display(), "Configuration loaded");

    let controller = commands::build_controller(&config, &paths, cli.format)?;

    match cli.command {
        Commands::Status => commands::status(&controller, &cli.format).await,
        Commands::Resume { url } => commands::resume(&controller, &url, &cli.format).await,
        Commands::Login => commands::login(&controller, &cli.format),
        Commands::Logout => commands::logout(&controller, &cli.format).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e), &format);
        std::process::exit(1);
    }
}
