//! DocChat - terminal chat client library for the document assistant
//!
//! This library provides the core functionality of the DocChat client:
//! a unidirectional chat store over a pluggable backend, and the
//! session-aware chat widget that renders its state, including the
//! typewriter reveal of assistant replies.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `model`: Messages, sessions and folder trees as the backend sends them
//! - `backend`: Backend abstraction and implementations (HTTP, in-memory)
//! - `store`: Chat state, actions and the effect-running store loop
//! - `widget`: Formatting, typing animation, staleness and the widget controller
//! - `commands`: Handlers for the CLI commands
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use docchat::backend::create_backend;
//! use docchat::store::spawn_store;
//! use docchat::widget::ChatWidget;
//! use docchat::Config;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let (dispatcher, _state, _handle) =
//!         spawn_store(create_backend(&config)?, CancellationToken::new());
//!     let mut widget = ChatWidget::new(dispatcher, &config.widget, None);
//!     widget.toggle_visible();
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod model;
pub mod store;
pub mod widget;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, DocChatError, Result};
pub use store::{ChatAction, ChatState};
pub use widget::ChatWidget;

#[cfg(test)]
pub mod test_utils;
