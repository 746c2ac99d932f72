//! Logging Module
//!
//! Application logging via tracing: a compact console layer plus a
//! daily-rolling file layer under the configured log directory, partitioned
//! by hostname.

use crate::{ApiError, Result};
use std::path::PathBuf;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub app_log_dir: PathBuf,
    pub log_level: String,
    pub hostname: String,
}

/// Logger manager for application log setup
pub struct LoggerManager {
    config: LoggingConfig,
}

impl LoggerManager {
    /// Create a new logger manager
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    /// Create a logger manager from the service configuration
    pub fn from_config(config: &crate::config::Config, hostname: String) -> Self {
        Self::new(LoggingConfig {
            app_log_dir: config.app_log_dir(),
            log_level: config.logging.log_level.clone(),
            hostname,
        })
    }

    /// Initialize the logging system
    ///
    /// `RUST_LOG` takes precedence over the configured level. Returns an
    /// error if a global subscriber is already installed.
    pub fn initialize(&self) -> Result<()> {
        // Host-specific log directory, one file series per host
        let host_log_dir = self.config.app_log_dir.join(&self.config.hostname);
        std::fs::create_dir_all(&host_log_dir)
            .map_err(|e| ApiError::IoError(format!("Failed to create log directory: {}", e)))?;

        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, host_log_dir, "random-image-api.log");

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.log_level.clone()));

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .with_target(true)
            .compact();

        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .compact();

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .try_init()
            .map_err(|e| {
                ApiError::ConfigError(format!("Failed to initialize logging: {}", e))
            })?;

        info!("Logging system initialized");
        Ok(())
    }
}
