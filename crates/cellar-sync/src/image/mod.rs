//! Out-of-band storage for inline offer images.
//!
//! Images never reach the catalog. The winning offer's data URI is decoded
//! and written to `<root>/wines/<upc>.<ext>`, where `ext` comes from the
//! declared media type.

mod data_uri;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::report::FailureKind;
use data_uri::DataUri;

const WINES_DIR: &str = "wines";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unsupported image type \"{0}\"")]
    UnsupportedImageType(String),

    #[error("invalid image payload: {0}")]
    InvalidPayload(String),

    #[error("upc {0:?} cannot be used as an image file name")]
    InvalidKey(String),

    #[error("failed to write image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImageError {
    /// Report category for this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            ImageError::UnsupportedImageType(_) => FailureKind::UnsupportedImageType,
            ImageError::InvalidPayload(_) | ImageError::InvalidKey(_) => {
                FailureKind::InvalidImagePayload
            }
            ImageError::Io { .. } => FailureKind::ImageWriteFailure,
        }
    }
}

/// What [`ImageSink::store`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// The offer carried no image.
    Absent,
    Written(PathBuf),
    /// The file already held identical bytes; nothing was written.
    Unchanged(PathBuf),
}

/// File extension for a supported image media type.
#[must_use]
pub fn extension_for(mime: &str) -> Option<&'static str> {
    match mime.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        _ => None,
    }
}

/// Writes decoded images beneath a blob root. The sink is the only writer
/// of files under `<root>/wines/`.
#[derive(Debug, Clone)]
pub struct ImageSink {
    root: PathBuf,
}

impl ImageSink {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination for `upc` with extension `ext`.
    #[must_use]
    pub fn path_for(&self, upc: &str, ext: &str) -> PathBuf {
        self.root.join(WINES_DIR).join(format!("{upc}.{ext}"))
    }

    /// Decodes `payload` and writes it as the image for `upc`.
    ///
    /// The media type is checked before anything touches the filesystem, so
    /// a rejected payload never leaves a file behind. Writes go through a
    /// temporary sibling and a rename; a reader sees either the old image or
    /// the new one.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    ///
    /// - [`ImageError::InvalidPayload`]: not a data URI.
    /// - [`ImageError::UnsupportedImageType`]: media type other than JPEG or PNG.
    /// - [`ImageError::InvalidKey`]: `upc` is not a safe file stem.
    /// - [`ImageError::InvalidPayload`]: the body does not decode.
    /// - [`ImageError::Io`]: the directory or file could not be written.
    pub async fn store(
        &self,
        upc: &str,
        payload: Option<&str>,
    ) -> Result<ImageOutcome, ImageError> {
        let Some(payload) = payload else {
            return Ok(ImageOutcome::Absent);
        };
        let uri = DataUri::parse(payload)?;
        let ext = extension_for(&uri.mime).ok_or_else(|| {
            ImageError::UnsupportedImageType(if uri.mime.is_empty() {
                "(none)".to_string()
            } else {
                uri.mime.clone()
            })
        })?;
        validate_key(upc)?;
        let bytes = uri.decode()?;

        let path = self.path_for(upc, ext);
        if let Ok(existing) = tokio::fs::read(&path).await {
            if existing == bytes {
                return Ok(ImageOutcome::Unchanged(path));
            }
        }

        let dir = self.root.join(WINES_DIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| ImageError::Io {
                path: dir.clone(),
                source,
            })?;

        let tmp = dir.join(format!(".{upc}.{ext}.tmp"));
        if let Err(source) = write_then_rename(&tmp, &path, &bytes).await {
            // Best-effort: a leftover temp file is overwritten by the next attempt.
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(ImageError::Io { path, source });
        }

        tracing::debug!(upc, path = %path.display(), bytes = bytes.len(), "image written");
        Ok(ImageOutcome::Written(path))
    }
}

async fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(tmp, bytes).await?;
    tokio::fs::rename(tmp, path).await
}

/// A UPC becomes a file stem, so it must not be able to escape `<root>/wines`.
fn validate_key(upc: &str) -> Result<(), ImageError> {
    let unsafe_key = upc.is_empty()
        || upc == "."
        || upc == ".."
        || upc.starts_with('.')
        || upc.chars().any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control());
    if unsafe_key {
        return Err(ImageError::InvalidKey(upc.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../image_test.rs"]
mod tests;
