//! Startup Validation Module
//!
//! Establishes and validates the directories the service needs before it
//! starts serving. Failures here are configuration errors and abort startup.

use crate::{ApiError, Result};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// Validates required directories on startup
pub struct DirectoryValidator;

impl DirectoryValidator {
    /// Validate all required directories, creating them if missing
    pub fn validate_all(image_dir: &Path, data_file: &Path, app_log_dir: &Path) -> Result<()> {
        info!("Validating directories...");

        Self::validate_directory(image_dir, "Image")?;

        // The data file lives in its parent directory; the file itself is
        // created by the stats store on first load.
        let data_dir = data_file.parent().ok_or_else(|| {
            ApiError::ConfigError(format!(
                "Data file path has no parent directory: {}",
                data_file.display()
            ))
        })?;
        Self::validate_directory(data_dir, "Data")?;

        Self::validate_directory(app_log_dir, "Log")?;

        info!("All directories validated successfully");
        Ok(())
    }

    /// Validate a single directory has read/write permissions
    fn validate_directory(dir_path: &Path, dir_type: &str) -> Result<()> {
        let dir_path_str = dir_path.display();

        if !dir_path.exists() {
            info!(
                "{} directory does not exist, attempting to create: {}",
                dir_type, dir_path_str
            );

            if let Err(e) = fs::create_dir_all(dir_path) {
                error!("{} directory creation failed: {}", dir_type, dir_path_str);
                return Err(ApiError::ConfigError(format!(
                    "Failed to create {} directory '{}': {}\n\n\
                    Please ensure:\n\
                    1. The parent directory exists and is writable\n\
                    2. You have permission to create directories in this location",
                    dir_type, dir_path_str, e
                )));
            }

            info!(
                "{} directory created successfully: {}",
                dir_type, dir_path_str
            );
        }

        // Validate read permission
        if let Err(e) = fs::read_dir(dir_path) {
            error!("{} directory is not readable: {}", dir_type, dir_path_str);
            return Err(ApiError::ConfigError(format!(
                "Cannot read {} directory '{}': {}",
                dir_type, dir_path_str, e
            )));
        }

        // Validate write permission by attempting to create a test file
        let test_file = dir_path.join(".permission_test");
        if let Err(e) = fs::write(&test_file, b"test") {
            error!("{} directory is not writable: {}", dir_type, dir_path_str);
            return Err(ApiError::ConfigError(format!(
                "Cannot write to {} directory '{}': {}",
                dir_type, dir_path_str, e
            )));
        }

        if let Err(e) = fs::remove_file(&test_file) {
            warn!("Failed to remove permission test file: {}", e);
        }

        info!(
            "{} directory permissions validated: {}",
            dir_type, dir_path_str
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(DirectoryValidator::validate_directory(temp_dir.path(), "Test").is_ok());
    }

    #[test]
    fn test_validate_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path().join("subdir");

        assert!(DirectoryValidator::validate_directory(&dir_path, "Test").is_ok());
        assert!(dir_path.exists());
    }

    #[test]
    fn test_validate_all_creates_layout() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();

        let image_dir = base.join("resources");
        let data_file = base.join("state").join("data.json");
        let log_dir = base.join("logs");

        assert!(DirectoryValidator::validate_all(&image_dir, &data_file, &log_dir).is_ok());

        assert!(image_dir.exists());
        assert!(base.join("state").exists());
        assert!(log_dir.exists());
        // The data file itself is not created here
        assert!(!data_file.exists());
    }

    #[test]
    fn test_data_file_without_parent_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let image_dir = temp_dir.path().join("resources");
        let log_dir = temp_dir.path().join("logs");

        let result =
            DirectoryValidator::validate_all(&image_dir, Path::new("/"), &log_dir);
        assert!(result.is_err());
    }
}
