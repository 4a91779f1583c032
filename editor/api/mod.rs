mod client;
mod error;

pub use client::HttpEditClient;
pub use error::ApiError;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use super::tool::ToolMode;
use super::upload::{human_size, sniff_mime, ImageFile};

/// Image bytes returned by an endpoint, held so they can be saved later
/// without another round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub bytes: Bytes,
    pub mime: String,
}

impl ImageBlob {
    pub fn new(bytes: impl Into<Bytes>, mime: impl Into<String>) -> Self {
        ImageBlob {
            bytes: bytes.into(),
            mime: mime.into(),
        }
    }

    /// Builds a blob from a response body, trusting the declared content type
    /// only when it is an image type.
    pub fn from_response(bytes: Bytes, content_type: Option<&str>) -> Result<Self, ApiError> {
        let declared = content_type
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase());

        let mime = match declared {
            Some(mime) if mime.starts_with("image/") => mime,
            _ => sniff_mime("", &bytes),
        };

        if !mime.starts_with("image/") {
            return Err(ApiError::UnexpectedBody { mime });
        }
        Ok(ImageBlob { bytes, mime })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn summary(&self) -> String {
        format!("{} · {}", self.mime, human_size(self.size()))
    }
}

/// One upload, fully described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditRequest {
    RemoveBackground {
        image: ImageFile,
    },
    /// `subject` is the cutout from an earlier background removal of the same
    /// image. When missing it is produced first.
    Blur {
        original: ImageFile,
        subject: Option<ImageBlob>,
        strength: u8,
    },
    AiBackground {
        image: ImageFile,
        prompt: String,
    },
}

impl EditRequest {
    pub fn tool(&self) -> ToolMode {
        match self {
            EditRequest::RemoveBackground { .. } => ToolMode::RemoveBackground,
            EditRequest::Blur { .. } => ToolMode::Blur,
            EditRequest::AiBackground { .. } => ToolMode::AiBackground,
        }
    }

    pub fn source(&self) -> &ImageFile {
        match self {
            EditRequest::RemoveBackground { image } => image,
            EditRequest::Blur { original, .. } => original,
            EditRequest::AiBackground { image, .. } => image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub result: ImageBlob,
    /// Background-removal cutout, when one was produced or reused.
    pub subject: Option<ImageBlob>,
}

#[async_trait]
pub trait EditService: Send + Sync {
    async fn remove_background(
        &self,
        image: &ImageFile,
        cancel: &CancellationToken,
    ) -> Result<ImageBlob, ApiError>;

    async fn blur_background(
        &self,
        original: &ImageFile,
        subject: &ImageBlob,
        strength: u8,
        cancel: &CancellationToken,
    ) -> Result<ImageBlob, ApiError>;

    async fn ai_background(
        &self,
        image: &ImageFile,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<ImageBlob, ApiError>;

    async fn process(
        &self,
        request: EditRequest,
        cancel: CancellationToken,
    ) -> Result<EditOutcome, ApiError> {
        match request {
            EditRequest::RemoveBackground { image } => {
                let result = self.remove_background(&image, &cancel).await?;
                Ok(EditOutcome {
                    subject: Some(result.clone()),
                    result,
                })
            }
            EditRequest::Blur {
                original,
                subject,
                strength,
            } => {
                let subject = match subject {
                    Some(subject) => subject,
                    None => self.remove_background(&original, &cancel).await?,
                };
                let result = self
                    .blur_background(&original, &subject, strength, &cancel)
                    .await?;
                Ok(EditOutcome {
                    result,
                    subject: Some(subject),
                })
            }
            EditRequest::AiBackground { image, prompt } => {
                let result = self.ai_background(&image, &prompt, &cancel).await?;
                Ok(EditOutcome {
                    result,
                    subject: None,
                })
            }
        }
    }
}
