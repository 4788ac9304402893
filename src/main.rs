//! DocChat - terminal chat client for the document assistant
//!
#![doc = "DocChat - terminal chat client for the document assistant"]
#![doc = "Main entry point for the DocChat application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docchat::cli::{Cli, Commands};
use docchat::commands;
use docchat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { session, file } => {
            tracing::info!("Starting interactive chat mode");
            if let Some(s) = &session {
                tracing::debug!("Opening session: {}", s);
            }
            if let Some(f) = &file {
                tracing::debug!("Scoping chat to document: {}", f);
            }

            // Moves `config` into the handler (match arms are exclusive)
            commands::chat::run_chat(config, session, file).await?;
            Ok(())
        }
        Commands::Sessions { json } => {
            tracing::info!("Listing chat sessions");
            commands::history::handle_sessions(&config, json).await?;
            Ok(())
        }
        Commands::History { session_id } => {
            tracing::info!("Printing session transcript");
            commands::history::handle_history(&config, &session_id).await?;
            Ok(())
        }
    }
}

/// Initialize the tracing subscriber
///
/// Logs go to stderr so transcripts on stdout stay clean. `RUST_LOG`
/// overrides the default filter.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "docchat=debug" } else { "docchat=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
