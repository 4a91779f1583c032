use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;

/// Largest file accepted for upload: 10 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Please select a valid image file (JPG or PNG).")]
    NotAnImage { mime: String },

    #[error("File size too large. Please select an image under 10MB.")]
    TooLarge { size: u64 },

    #[error("The selected file is empty.")]
    Empty,

    #[error("Could not read {path:?}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

/// A validated image chosen by the user, held in memory until uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
    pub path: Option<PathBuf>,
}

impl ImageFile {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let unreadable = |err: std::io::Error| UploadError::Unreadable {
            path: path.to_path_buf(),
            message: err.to_string(),
        };

        // Reject oversized files before pulling them into memory.
        let metadata = fs::metadata(path).map_err(unreadable)?;
        if metadata.is_dir() {
            return Err(UploadError::NotAnImage {
                mime: "inode/directory".to_string(),
            });
        }
        if metadata.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge {
                size: metadata.len(),
            });
        }

        let bytes = fs::read(path).map_err(unreadable)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());

        let mut file = Self::from_bytes(name, bytes)?;
        file.path = Some(path.to_path_buf());
        Ok(file)
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Result<Self, UploadError> {
        let name = name.into();
        let bytes = bytes.into();
        let mime = sniff_mime(&name, &bytes);
        validate(&mime, bytes.len() as u64)?;

        tracing::debug!(%name, %mime, size = bytes.len(), "accepted image");
        Ok(ImageFile {
            name,
            mime,
            bytes,
            path: None,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => self.name.as_str(),
        }
    }
}

/// Checks the upload constraints: an `image/*` MIME type and at most 10 MiB.
pub fn validate(mime: &str, size: u64) -> Result<(), UploadError> {
    if !mime.starts_with("image/") {
        return Err(UploadError::NotAnImage {
            mime: mime.to_string(),
        });
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge { size });
    }
    if size == 0 {
        return Err(UploadError::Empty);
    }
    Ok(())
}

/// Magic bytes win; the extension is only consulted when they are inconclusive.
pub fn sniff_mime(name: &str, bytes: &[u8]) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    mime_from_extension(name)
        .unwrap_or("application/octet-stream")
        .to_string()
}

fn mime_from_extension(name: &str) -> Option<&'static str> {
    let (_, extension) = name.rsplit_once('.')?;
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        "heic" => Some("image/heic"),
        "avif" => Some("image/avif"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

pub fn human_size(size: u64) -> String {
    const KIB: f64 = 1024.0;
    let size = size as f64;
    if size < KIB {
        format!("{size} B")
    } else if size < KIB * KIB {
        format!("{:.1} KB", size / KIB)
    } else {
        format!("{:.1} MB", size / (KIB * KIB))
    }
}
