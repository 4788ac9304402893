use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

use docchat::store::ChatState;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Configuration for the in-memory backend with fast animation timing
#[allow(dead_code)]
pub fn memory_config_yaml() -> &'static str {
    "backend: memory\nuser_id: \"42\"\nwidget:\n  animation:\n    initial_delay_ms: 10\n    char_interval_ms: 5\n    grace_ms: 20\n"
}

/// Wait until the published state satisfies `predicate`
///
/// # Panics
///
/// Panics if the store closes or nothing matches within five seconds
#[allow(dead_code)]
pub async fn wait_for_state(
    rx: &mut watch::Receiver<ChatState>,
    predicate: impl Fn(&ChatState) -> bool,
) -> ChatState {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let state = rx.borrow_and_update();
                if predicate(&state) {
                    return state.clone();
                }
            }
            rx.changed().await.expect("store closed");
        }
    })
    .await
    .expect("timed out waiting for chat state")
}
