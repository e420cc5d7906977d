use std::time::Duration;

/// Simulated processing time between accepting a file and showing the result.
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(800);
/// Upload limit advertised to the user ("Max: 5MB").
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;
/// Side length of the rendered QR surface in pixels.
pub const DEFAULT_QR_SIZE: u32 = 200;
pub const DEFAULT_DOWNLOAD_NAME: &str = "qrcode.png";

/// What string the QR code carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadMode {
    /// The object reference of the uploaded image. Only resolvable inside the
    /// session that created it.
    #[default]
    Reference,
    /// A `data:` URL embedding the image bytes.
    Inline,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub processing_delay: Duration,
    pub max_file_size: u64,
    pub qr_size: u32,
    pub download_name: String,
    pub payload_mode: PayloadMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            processing_delay: DEFAULT_PROCESSING_DELAY,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            qr_size: DEFAULT_QR_SIZE,
            download_name: DEFAULT_DOWNLOAD_NAME.to_string(),
            payload_mode: PayloadMode::Reference,
        }
    }
}
