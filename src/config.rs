//! Configuration management for DocChat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{DocChatError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Backends accepted in `backend`
pub const VALID_BACKENDS: [&str; 2] = ["memory", "http"];

/// Main configuration structure for DocChat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which backend to use: `memory` or `http`
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Identifier of the signed-in user, passed to folder listings
    #[serde(default)]
    pub user_id: Option<String>,

    /// HTTP API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Chat widget behavior
    #[serde(default)]
    pub widget: WidgetConfig,
}

fn default_backend() -> String {
    "memory".to_string()
}

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL all endpoint paths are appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout (seconds)
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_seconds: default_api_timeout(),
        }
    }
}

/// Chat widget configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Typing animation timing
    #[serde(default)]
    pub animation: AnimationConfig,

    /// Window sizing
    #[serde(default)]
    pub window: WindowConfig,
}

/// Typing animation configuration
///
/// All delays are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Play the character reveal for new assistant replies
    #[serde(default = "default_animation_enabled")]
    pub enabled: bool,

    /// Delay before the first character
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Delay between characters
    #[serde(default = "default_char_interval")]
    pub char_interval_ms: u64,

    /// Pause after the last character before typing is reported done
    #[serde(default = "default_grace")]
    pub grace_ms: u64,
}

fn default_animation_enabled() -> bool {
    true
}

fn default_initial_delay() -> u64 {
    100
}

fn default_char_interval() -> u64 {
    30
}

fn default_grace() -> u64 {
    500
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enabled: default_animation_enabled(),
            initial_delay_ms: default_initial_delay(),
            char_interval_ms: default_char_interval(),
            grace_ms: default_grace(),
        }
    }
}

impl AnimationConfig {
    /// Delay before the first character
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Delay between characters
    pub fn char_interval(&self) -> Duration {
        Duration::from_millis(self.char_interval_ms)
    }

    /// Pause after the last character
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

/// Window sizing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Width the widget opens with
    #[serde(default = "default_width")]
    pub default_width: f64,

    /// Height the widget opens with
    #[serde(default = "default_height")]
    pub default_height: f64,

    /// Number of grow steps allowed above the default size
    #[serde(default = "default_max_resizes")]
    pub max_resizes: u32,

    /// Fraction of the current size added or removed per step
    #[serde(default = "default_resize_step")]
    pub resize_step: f64,
}

fn default_width() -> f64 {
    450.0
}

fn default_height() -> f64 {
    600.0
}

fn default_max_resizes() -> u32 {
    2
}

fn default_resize_step() -> f64 {
    0.3
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            default_width: default_width(),
            default_height: default_height(),
            max_resizes: default_max_resizes(),
            resize_step: default_resize_step(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DocChatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| DocChatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(backend) = std::env::var("DOCCHAT_BACKEND") {
            self.backend = backend;
        }

        if let Ok(url) = std::env::var("DOCCHAT_API_URL") {
            self.api.base_url = url;
        }

        if let Ok(token) = std::env::var("DOCCHAT_API_TOKEN") {
            self.api.token = Some(token);
        }

        if let Ok(user_id) = std::env::var("DOCCHAT_USER_ID") {
            self.user_id = Some(user_id);
        }

        if let Ok(timeout) = std::env::var("DOCCHAT_API_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid DOCCHAT_API_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(enabled) = std::env::var("DOCCHAT_ANIMATION_ENABLED") {
            match enabled.parse::<bool>() {
                Ok(v) => {
                    self.widget.animation.enabled = v;
                    tracing::debug!(enabled = v, "Env override: DOCCHAT_ANIMATION_ENABLED");
                }
                Err(_) => {
                    tracing::warn!("Invalid value for DOCCHAT_ANIMATION_ENABLED: {}", enabled);
                }
            }
        }

        if let Ok(interval) = std::env::var("DOCCHAT_CHAR_INTERVAL_MS") {
            match interval.parse::<u64>() {
                Ok(v) => {
                    self.widget.animation.char_interval_ms = v;
                    tracing::debug!(char_interval_ms = v, "Env override: DOCCHAT_CHAR_INTERVAL_MS");
                }
                Err(_) => {
                    tracing::warn!("Invalid value for DOCCHAT_CHAR_INTERVAL_MS: {}", interval);
                }
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(url) = &cli.api_url {
            self.api.base_url = url.clone();
        }

        if let Some(backend) = &cli.backend {
            self.backend = backend.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if !VALID_BACKENDS.contains(&self.backend.as_str()) {
            return Err(DocChatError::Config(format!(
                "Invalid backend: {}. Must be one of: {}",
                self.backend,
                VALID_BACKENDS.join(", ")
            ))
            .into());
        }

        if self.backend == "http" {
            url::Url::parse(&self.api.base_url).map_err(|e| {
                DocChatError::Config(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
            })?;
        }

        if self.api.timeout_seconds == 0 {
            return Err(DocChatError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.widget.animation.char_interval_ms == 0 {
            return Err(DocChatError::Config(
                "widget.animation.char_interval_ms must be greater than 0".to_string(),
            )
            .into());
        }

        let window = &self.widget.window;
        if window.resize_step <= 0.0 || window.resize_step >= 1.0 {
            return Err(DocChatError::Config(
                "widget.window.resize_step must be between 0.0 and 1.0".to_string(),
            )
            .into());
        }

        if window.default_width <= 0.0 || window.default_height <= 0.0 {
            return Err(DocChatError::Config(
                "widget.window default dimensions must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            user_id: None,
            api: ApiConfig::default(),
            widget: WidgetConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend, "memory");
        assert_eq!(config.widget.animation.initial_delay_ms, 100);
        assert_eq!(config.widget.animation.char_interval_ms, 30);
        assert_eq!(config.widget.animation.grace_ms, 500);
        assert_eq!(config.widget.window.max_resizes, 2);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_backend() {
        let mut config = Config::default();
        config.backend = "grpc".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_url_only_matters_for_http() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_ok());

        config.backend = "http".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_interval() {
        let mut config = Config::default();
        config.widget.animation.char_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_resize_step_bounds() {
        let mut config = Config::default();
        config.widget.window.resize_step = 1.0;
        assert!(config.validate().is_err());

        config.widget.window.resize_step = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
backend: http
user_id: "u-7"
api:
  base_url: https://docs.example.com/api
  timeout_seconds: 10
widget:
  animation:
    enabled: false
    char_interval_ms: 15
  window:
    default_width: 500
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.backend, "http");
        assert_eq!(config.user_id.as_deref(), Some("u-7"));
        assert_eq!(config.api.timeout_seconds, 10);
        assert!(!config.widget.animation.enabled);
        assert_eq!(config.widget.animation.char_interval_ms, 15);
        assert_eq!(config.widget.animation.grace_ms, 500);
        assert_eq!(config.widget.window.default_width, 500.0);
        assert_eq!(config.widget.window.default_height, 600.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let cli = Cli::default();
        let config = Config::load("/nonexistent/docchat.yaml", &cli).unwrap();
        assert_eq!(config.api.timeout_seconds, 30);
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides() {
        std::env::set_var("DOCCHAT_BACKEND", "http");
        std::env::set_var("DOCCHAT_API_TOKEN", "secret");
        std::env::set_var("DOCCHAT_CHAR_INTERVAL_MS", "not-a-number");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("DOCCHAT_BACKEND");
        std::env::remove_var("DOCCHAT_API_TOKEN");
        std::env::remove_var("DOCCHAT_CHAR_INTERVAL_MS");

        assert_eq!(config.backend, "http");
        assert_eq!(config.api.token.as_deref(), Some("secret"));
        assert_eq!(config.widget.animation.char_interval_ms, 30);
    }

    #[test]
    fn test_cli_overrides_win() {
        let cli = Cli {
            api_url: Some("http://127.0.0.1:9000/api".to_string()),
            backend: Some("http".to_string()),
            ..Cli::default()
        };
        let mut config = Config::default();
        config.apply_cli_overrides(&cli);
        assert_eq!(config.backend, "http");
        assert_eq!(config.api.base_url, "http://127.0.0.1:9000/api");
    }

    #[test]
    fn test_animation_durations() {
        let animation = AnimationConfig::default();
        assert_eq!(animation.initial_delay(), Duration::from_millis(100));
        assert_eq!(animation.char_interval(), Duration::from_millis(30));
        assert_eq!(animation.grace(), Duration::from_millis(500));
    }
}
