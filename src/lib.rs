pub mod error;
pub mod export;
pub mod page;
pub mod qr;
pub mod reference;
pub mod settings;
pub mod upload;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{Error, Result};
pub use export::{DirectorySaver, FileSaver};
pub use page::{Page, PageState, Ticket, View};
pub use qr::{render_qr, QrSurface};
pub use reference::{MemoryStore, ReferenceProvider};
pub use settings::{
    PayloadMode, Settings, DEFAULT_DOWNLOAD_NAME, DEFAULT_MAX_FILE_SIZE, DEFAULT_PROCESSING_DELAY,
    DEFAULT_QR_SIZE,
};
pub use upload::{validate, DragEvent, ImageFile};

#[cfg(feature = "decode")]
pub use qr::{decode_qr_from_gray, decode_qr_image, decode_qr_png};
