//! Command-line interface definition for DocChat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, session listing and
//! transcript printing.

use clap::{Parser, Subcommand};

/// DocChat - terminal client for the document assistant
///
/// Chat about your documents, browse previous sessions and replay
/// transcripts from the command line.
#[derive(Parser, Debug, Clone)]
#[command(name = "docchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the API base URL
    #[arg(long, env = "DOCCHAT_API_URL")]
    pub api_url: Option<String>,

    /// Backend to talk to (memory, http)
    #[arg(short, long, global = true)]
    pub backend: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for DocChat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the interactive chat widget
    Chat {
        /// Open an existing session instead of a new chat
        #[arg(short, long)]
        session: Option<String>,

        /// Scope the conversation to a document id
        #[arg(short, long)]
        file: Option<String>,
    },

    /// List chat sessions
    Sessions {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the transcript of a session
    History {
        /// Session identifier
        session_id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            api_url: None,
            backend: None,
            command: Commands::Chat {
                session: None,
                file: None,
            },
        }
    }
}
