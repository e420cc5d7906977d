use image::ImageFormat;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::qr::QrSurface;

/// Host action that hands a finished file to the user.
pub trait FileSaver {
    fn save(&mut self, bytes: &[u8], filename: &str) -> Result<()>;
}

impl QrSurface {
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image()
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

/// Saves downloads into a directory, creating it on first use.
#[derive(Debug)]
pub struct DirectorySaver {
    dir: PathBuf,
    saved: Vec<PathBuf>,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            saved: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far, oldest first.
    pub fn saved(&self) -> &[PathBuf] {
        &self.saved
    }
}

impl FileSaver for DirectorySaver {
    fn save(&mut self, bytes: &[u8], filename: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        fs::write(&path, bytes)?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "saved download");
        self.saved.push(path);
        Ok(())
    }
}
