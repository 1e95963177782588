//! Turning a user supplied file into an [`ImageAsset`].
//!
//! A [`CandidateFile`] is whatever the front end got hold of, either through a
//! picker or a drop. It carries a declared media type the same way a browser
//! `File` does: derived from the name, not sniffed from the content.
//! [`load_candidate`] validates that type and performs the one asynchronous
//! read, the session decides what to do with the outcome.

use std::path::{Path, PathBuf};

use log::{debug, error};
use thiserror::Error;

use crate::data_uri::DataUri;

const IMAGE_TYPE_PREFIX: &str = "image/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub data_uri: DataUri,
    pub original_name: String,
}

impl ImageAsset {
    /// The transport form handed to the generation collaborator
    pub fn encoded_data(&self) -> String {
        self.data_uri.to_string()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Invalid file type. Please upload an image.")]
    InvalidType,

    #[error("Failed to read the image file.")]
    ReadFailure { detail: String },
}

#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub media_type: String,
    source: Source,
}

#[derive(Debug, Clone)]
enum Source {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl CandidateFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let media_type = media_type_for_path(&path).unwrap_or_default().to_string();
        Self {
            name,
            media_type,
            source: Source::Path(path),
        }
    }

    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            source: Source::Bytes(bytes),
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with(IMAGE_TYPE_PREFIX)
    }

    async fn read(self) -> std::io::Result<Vec<u8>> {
        match self.source {
            Source::Path(path) => tokio::fs::read(&path).await,
            Source::Bytes(bytes) => Ok(bytes),
        }
    }
}

/// Validates the declared type, then reads and encodes the file.
///
/// `None` stands for "no file was handed over" and is rejected like a wrong type.
pub async fn load_candidate(file: Option<CandidateFile>) -> Result<ImageAsset, UploadError> {
    let file = file.ok_or(UploadError::InvalidType)?;
    if !file.is_image() {
        debug!(
            "Rejecting {:?}, declared type {:?} is not an image",
            file.name, file.media_type
        );
        return Err(UploadError::InvalidType);
    }

    let name = file.name.clone();
    let media_type = file.media_type.clone();
    let bytes = file.read().await.map_err(|e| {
        error!("Reading {name:?} failed: {e}");
        UploadError::ReadFailure {
            detail: e.to_string(),
        }
    })?;
    debug!("Read {} bytes from {name:?}", bytes.len());

    Ok(ImageAsset {
        data_uri: DataUri::encode(media_type, &bytes),
        original_name: name,
    })
}

/// Declared media type for a file name, the way a file picker would report it
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "ico" => "image/vnd.microsoft.icon",
        "avif" => "image/avif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        _ => return None,
    })
}
