//! Test utilities for DocChat
//!
//! This module provides common test utilities including temporary config
//! files, a detached action dispatcher and assertion helpers.

use crate::config::Config;
use crate::model::TreeNode;
use crate::store::{ChatAction, Dispatcher};
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: crate::error::Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Dispatcher whose actions land in the returned receiver instead of a store
pub fn test_dispatcher() -> (Dispatcher, mpsc::UnboundedReceiver<ChatAction>) {
    Dispatcher::channel()
}

/// A small folder tree: Company/{Invoices/march.pdf, handbook.pdf}
pub fn sample_tree() -> Vec<TreeNode> {
    vec![TreeNode::folder(
        "1",
        "Company",
        vec![
            TreeNode::folder("2", "Invoices", vec![TreeNode::file("10", "march.pdf")]),
            TreeNode::file("11", "handbook.pdf"),
        ],
    )]
}

/// Create a test configuration YAML string
pub fn test_config_yaml() -> String {
    r#"
backend: memory
user_id: "42"
api:
  base_url: http://127.0.0.1:9/api
  timeout_seconds: 5
widget:
  animation:
    enabled: true
    initial_delay_ms: 10
    char_interval_ms: 5
    grace_ms: 50
  window:
    default_width: 400
    default_height: 500
    max_resizes: 3
    resize_step: 0.25
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::error::DocChatError;

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "test.txt", "content");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: crate::error::Result<()> =
            Err(DocChatError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }

    #[test]
    #[serial_test::serial]
    fn test_config_yaml_loads_from_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "config.yaml", &test_config_yaml());
        let config = Config::load(path.to_str().unwrap(), &Cli::default()).unwrap();

        assert_eq!(config.user_id.as_deref(), Some("42"));
        assert_eq!(config.widget.window.max_resizes, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "config.yaml", "backend: [unclosed");
        assert_error_contains(
            Config::load(path.to_str().unwrap(), &Cli::default()),
            "Failed to parse config",
        );
    }

    #[tokio::test]
    async fn test_dispatcher_delivers_actions() {
        let (dispatcher, mut rx) = test_dispatcher();
        dispatcher.dispatch(ChatAction::FetchSessions).unwrap();
        assert_eq!(rx.recv().await, Some(ChatAction::FetchSessions));
    }

    #[test]
    fn test_sample_tree_shape() {
        let tree = sample_tree();
        assert!(crate::model::find_in(&tree, "10").is_some());
    }
}
