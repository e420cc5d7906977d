use qrcode::types::QrError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{name}: unsupported file type ({reason})")]
    UnsupportedType { name: String, reason: String },

    #[error("{name}: file is too large ({size} bytes, limit is {limit} bytes)")]
    TooLarge { name: String, size: u64, limit: u64 },

    #[error("No QR code to export yet, upload an image first")]
    ExportUnavailable,

    #[error("Failed to create QR code: {0}")]
    Encode(#[from] QrError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser error: {0}")]
    Host(String),
}

impl Error {
    pub fn unsupported_type(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedType {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn too_large(name: impl Into<String>, size: u64, limit: u64) -> Self {
        Self::TooLarge {
            name: name.into(),
            size,
            limit,
        }
    }
}
