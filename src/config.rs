//! Configuration Module
//!
//! Handles configuration loading from files, environment variables, and
//! command-line arguments. Supports YAML configuration files.

use crate::{ApiError, Result};
use clap::{Arg, Command};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Environment variable naming the base directory, kept for compatibility
/// with existing deployments.
pub const BASE_DIR_ENV: &str = "RANDOM_IMAGE_API_PATH";

/// Fixed name of the image subdirectory under the base directory.
pub const IMAGE_SUBDIR: &str = "resources";

/// Fixed name of the persisted counter file under the base directory.
pub const DATA_FILE_NAME: &str = "data.json";

/// Fixed name of the log subdirectory under the base directory.
pub const LOG_SUBDIR: &str = "logs";

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 15555,
            bind_address: "0.0.0.0".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.port < 1024 {
            return Err(format!(
                "Server port must be 1024 or higher for non-privileged ports, got {}",
                self.port
            ));
        }
        if self.bind_address.is_empty() {
            return Err("Server bind address cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Storage layout configuration
///
/// `image_dir` and `data_file` derive from `base_dir` with fixed relative
/// names unless set explicitly, so tests can inject their own locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub base_dir: PathBuf,
    pub image_dir: Option<PathBuf>,
    pub data_file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("/random-image-api"),
            image_dir: None,
            data_file: None,
        }
    }
}

impl StorageConfig {
    /// Effective image directory
    pub fn image_dir(&self) -> PathBuf {
        self.image_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join(IMAGE_SUBDIR))
    }

    /// Effective data file path
    pub fn data_file(&self) -> PathBuf {
        self.data_file
            .clone()
            .unwrap_or_else(|| self.base_dir.join(DATA_FILE_NAME))
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.base_dir.as_os_str().is_empty() {
            return Err("Base directory cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
    pub app_log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            app_log_dir: None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Effective log directory
    pub fn app_log_dir(&self) -> PathBuf {
        self.logging
            .app_log_dir
            .clone()
            .unwrap_or_else(|| self.storage.base_dir.join(LOG_SUBDIR))
    }

    /// Load configuration from file, environment, and command line
    pub fn load() -> Result<Self> {
        let matches = Self::build_cli().get_matches();

        let mut config = Self::default();

        // Load from config file if specified
        if let Some(config_path) = matches.get_one::<String>("config") {
            config = Self::load_from_file(config_path)?;
        }

        // Override with environment variables
        config.apply_env_overrides();

        // Override with command line arguments
        if let Some(base_dir) = matches.get_one::<String>("base-dir") {
            config.storage.base_dir = PathBuf::from(base_dir);
        }
        if let Some(port) = matches.get_one::<String>("port") {
            match port.parse::<u16>() {
                Ok(p) => config.server.port = p,
                Err(_) => {
                    return Err(ApiError::ConfigError(format!("Invalid port: {}", port)));
                }
            }
        }
        if let Some(level) = matches.get_one::<String>("log-level") {
            config.logging.log_level = level.clone();
        }

        config.validate()?;

        debug!("Configuration: {:?}", config);
        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> Result<()> {
        if let Err(e) = self.server.validate() {
            return Err(ApiError::ConfigError(format!(
                "Invalid server configuration: {}",
                e
            )));
        }
        if let Err(e) = self.storage.validate() {
            return Err(ApiError::ConfigError(format!(
                "Invalid storage configuration: {}",
                e
            )));
        }
        Ok(())
    }

    /// Load configuration from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ApiError::ConfigError(format!("Failed to read config file '{}': {}", path, e))
        })?;
        let config: Config = serde_yaml::from_str(&contents).map_err(|e| {
            ApiError::ConfigError(format!("Failed to parse config file '{}': {}", path, e))
        })?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(base_dir) = std::env::var(BASE_DIR_ENV) {
            if !base_dir.is_empty() {
                self.storage.base_dir = PathBuf::from(base_dir);
            }
        }
        if let Ok(port) = std::env::var("HTTP_PORT") {
            if let Ok(p) = port.parse::<u16>() {
                self.server.port = p;
            }
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.log_level = level;
        }
    }

    /// Build CLI argument parser
    fn build_cli() -> Command {
        Command::new("random-image-api")
            .version(env!("CARGO_PKG_VERSION"))
            .about("HTTP service that serves a random image and tracks request counts")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path"),
            )
            .arg(
                Arg::new("base-dir")
                    .long("base-dir")
                    .value_name("DIR")
                    .help("Base directory holding resources/ and data.json"),
            )
            .arg(
                Arg::new("port")
                    .long("port")
                    .value_name("PORT")
                    .help("HTTP port (default: 15555)"),
            )
            .arg(
                Arg::new("log-level")
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level: trace, debug, info, warn, error"),
            )
    }
}
