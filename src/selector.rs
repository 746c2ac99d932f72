//! Selector Module
//!
//! Lists the image directory and picks one eligible file uniformly at
//! random. Selection is stateless: no memory of prior picks, no weighting.

use crate::{ApiError, Result};
use rand::Rng;
use std::path::{Path, PathBuf};

/// Recognized image file extensions. Matching is case-sensitive.
pub const ALLOWED_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"];

/// Picks random images from a fixed directory
#[derive(Debug, Clone)]
pub struct ImageSelector {
    image_dir: PathBuf,
}

impl ImageSelector {
    pub fn new(image_dir: PathBuf) -> Self {
        Self { image_dir }
    }

    /// Directory this selector scans
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Pick one eligible image uniformly at random.
    ///
    /// Returns the filename and its full path. Fails with
    /// `DirectoryUnreadable` if the directory cannot be listed and
    /// `EmptyDirectory` if no entry passes the extension allow-list.
    pub fn pick(&self) -> Result<(String, PathBuf)> {
        let entries =
            std::fs::read_dir(&self.image_dir).map_err(|e| ApiError::DirectoryUnreadable {
                dir: self.image_dir.clone(),
                cause: e.to_string(),
            })?;

        let mut images = Vec::new();
        for entry in entries.flatten() {
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(_) => continue,
            };
            if file_type.is_dir() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                if has_allowed_extension(&name) {
                    images.push(name);
                }
            }
        }

        if images.is_empty() {
            return Err(ApiError::EmptyDirectory {
                dir: self.image_dir.clone(),
            });
        }

        let index = rand::thread_rng().gen_range(0..images.len());
        let name = images.swap_remove(index);
        let path = self.image_dir.join(&name);
        Ok((name, path))
    }

    /// Best-effort count of non-directory entries in the image directory.
    /// Unreadable directories count as zero; used only for diagnostics.
    pub fn count_files(&self) -> usize {
        match std::fs::read_dir(&self.image_dir) {
            Ok(entries) => entries
                .flatten()
                .filter(|e| e.file_type().map(|t| !t.is_dir()).unwrap_or(false))
                .count(),
            Err(_) => 0,
        }
    }
}

/// Whether `name` ends with one of the allowed extensions (case-sensitive)
fn has_allowed_extension(name: &str) -> bool {
    ALLOWED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// MIME type for a filename, by extension.
///
/// Total over all inputs: allow-listed extensions map to their image type,
/// everything else falls back to the generic binary type.
pub fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".jpg") || name.ends_with(".jpeg") {
        "image/jpeg"
    } else if name.ends_with(".png") {
        "image/png"
    } else if name.ends_with(".gif") {
        "image/gif"
    } else if name.ends_with(".bmp") {
        "image/bmp"
    } else if name.ends_with(".webp") {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}
