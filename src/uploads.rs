//! Stored photos for flashcards
//!
//! Uploaded images are written under a server-generated `{uuid}.{ext}` name.
//! The original filename is only used to pick the extension.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Extension used when the upload has none
const FALLBACK_EXTENSION: &str = "jpg";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File {0} is not an image")]
    NotAnImage(String),

    #[error("Invalid stored filename: {0}")]
    InvalidFilename(String),
}

pub type Result<T> = std::result::Result<T, UploadError>;

/// Directory holding uploaded photos
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the upload directory if needed
    pub fn init(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored filename inside the upload directory
    pub fn path_for(&self, stored_name: &str) -> Result<PathBuf> {
        let valid = !stored_name.is_empty()
            && !stored_name.contains(['/', '\\'])
            && !stored_name.contains("..");
        if !valid {
            return Err(UploadError::InvalidFilename(stored_name.to_string()));
        }
        Ok(self.root.join(stored_name))
    }

    /// Write `data` under a fresh unique name, returning that name
    pub async fn save(&self, original_name: &str, data: &[u8]) -> Result<String> {
        let stored_name = format!("{}.{}", Uuid::new_v4(), stored_extension(original_name));
        let path = self.path_for(&stored_name)?;
        tokio::fs::write(&path, data).await?;
        log::debug!("Stored upload {:?} as {}", original_name, stored_name);
        Ok(stored_name)
    }

    /// Remove a stored image; a file that is already gone is not an error
    pub async fn remove(&self, stored_name: &str) -> Result<()> {
        let path = self.path_for(stored_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove several images, logging failures instead of returning them
    pub async fn remove_all(&self, stored_names: &[String]) {
        for name in stored_names {
            if let Err(e) = self.remove(name).await {
                log::warn!("Failed to remove stored image {}: {}", name, e);
            }
        }
    }
}

/// Whether a multipart content type denotes an image
pub fn is_image_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

/// Reject uploads whose content type is not `image/*`
pub fn ensure_image(original_name: &str, content_type: Option<&str>) -> Result<()> {
    if is_image_content_type(content_type) {
        Ok(())
    } else {
        Err(UploadError::NotAnImage(original_name.to_string()))
    }
}

/// Extension for the stored copy of `original_name`
fn stored_extension(original_name: &str) -> String {
    original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}
