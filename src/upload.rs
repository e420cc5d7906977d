use image::ImageFormat;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Formats the upload area advertises ("JPG, PNG, GIF").
pub const SUPPORTED_FORMATS: [ImageFormat; 3] =
    [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Gif];

/// A file handed over by the file picker or a drop, independent of the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    /// MIME type reported by the host. Advisory only, may be empty.
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string();
        let mime = ImageFormat::from_path(path)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_default();

        Ok(Self { name, mime, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Checks the advertised upload constraints and returns the sniffed format.
///
/// The MIME hint is only used to reject obvious non-images; the decision is
/// made on the file's magic bytes.
pub fn validate(file: &ImageFile, max_size: u64) -> Result<ImageFormat> {
    if file.size() > max_size {
        return Err(Error::too_large(&file.name, file.size(), max_size));
    }

    if !file.mime.is_empty() && !file.mime.starts_with("image/") {
        return Err(Error::unsupported_type(
            &file.name,
            format!("{} is not an image", file.mime),
        ));
    }

    let format = image::guess_format(&file.bytes)
        .map_err(|_| Error::unsupported_type(&file.name, "unrecognized image data"))?;

    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(Error::unsupported_type(
            &file.name,
            format!("{} images are not supported", format.to_mime_type()),
        ));
    }

    Ok(format)
}

/// Native drag events over the drop target. `F` is the host's file handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent<F> {
    Enter,
    Over,
    Leave,
    /// First file of the drop payload, if the payload carried any.
    Drop(Option<F>),
}

impl<F> DragEvent<F> {
    /// Maps a DOM event type name. `Drop` is built by the caller since it
    /// needs the payload.
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "dragenter" => Some(Self::Enter),
            "dragover" => Some(Self::Over),
            "dragleave" => Some(Self::Leave),
            _ => None,
        }
    }
}
