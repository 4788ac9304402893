//! Chat backend abstraction
//!
//! This module contains the [`ChatBackend`] trait the store's effects call,
//! plus an HTTP implementation for the document assistant API and an
//! in-memory implementation for offline use and tests.

pub mod http;
pub mod memory;

pub use http::HttpBackend;
pub use memory::MemoryBackend;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{ApiError, DocChatError, Result};
use crate::model::{Message, SendMessageRequest, Session, TreeNode};

/// Result of a backend request
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Operations the chat store performs against the document assistant
///
/// Every failure is normalized to [`ApiError`].
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send a prompt, optionally scoped to a document and session
    ///
    /// # Returns
    ///
    /// Returns the reply records; the assistant message is the first one
    /// not written by the user
    async fn send_message(&self, request: &SendMessageRequest) -> ApiResult<Vec<Message>>;

    /// List the user's chat sessions
    async fn fetch_sessions(&self) -> ApiResult<Vec<Session>>;

    /// Messages of one session
    async fn fetch_session_messages(&self, session_id: &str) -> ApiResult<Vec<Message>>;

    /// Folder tree, without file children
    async fn fetch_folders(&self, user_id: Option<&str>) -> ApiResult<Vec<TreeNode>>;

    /// File metadata of one folder
    async fn fetch_folder_files(&self, folder_id: &str) -> ApiResult<Vec<TreeNode>>;
}

/// Create a backend based on configuration
///
/// # Arguments
///
/// * `config` - Loaded configuration; `backend` selects the implementation
///
/// # Returns
///
/// Returns a shared backend instance
///
/// # Errors
///
/// Returns error if the backend type is unknown or the HTTP client cannot
/// be built
pub fn create_backend(config: &Config) -> Result<Arc<dyn ChatBackend>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryBackend::with_sample_data())),
        "http" => Ok(Arc::new(HttpBackend::new(&config.api)?)),
        other => Err(DocChatError::Backend(format!("Unknown backend type: {}", other)).into()),
    }
}
