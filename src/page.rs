//! The upload page: all UI state and the transitions between
//! `Idle`, `Loading` and `Ready`.
//!
//! Hosts drive the page with user events and own the clock. Accepting a file
//! returns a [`Ticket`]; the host waits `ticket.delay` and then calls
//! [`Page::complete`] with the ticket's generation. Only the newest ticket is
//! honored, so overlapping uploads resolve to the last accepted file no
//! matter in which order their timers fire.
//!
//! Hosts that read file contents asynchronously take the generation up front
//! with [`Page::begin_acquire`] when the user picks the file, then hand the
//! bytes over with [`Page::attach`]. The pick order decides, not the order in
//! which reads finish.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::ImageFormat;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::export::FileSaver;
use crate::qr::{render_qr, QrSurface};
use crate::reference::ReferenceProvider;
use crate::settings::{PayloadMode, Settings};
use crate::upload::{validate, DragEvent, ImageFile};

/// Proof that a file was accepted; redeem with [`Page::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub delay: Duration,
}

/// What the page shows. Loading and a visible result cannot coexist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Idle,
    Loading,
    Ready,
}

#[derive(Debug)]
pub enum View<'a> {
    Idle,
    Loading,
    Ready {
        image: &'a str,
        surface: &'a QrSurface,
    },
}

struct Acquired {
    image: String,
    surface: QrSurface,
}

struct Staged {
    file: ImageFile,
    format: ImageFormat,
}

struct Pending {
    generation: u64,
    /// `None` while the host is still reading the file.
    staged: Option<Staged>,
}

pub struct Page<R: ReferenceProvider> {
    settings: Settings,
    references: R,
    acquired: Option<Acquired>,
    pending: Option<Pending>,
    generation: u64,
    drag_active: bool,
    notice: Option<String>,
}

impl<R: ReferenceProvider> Page<R> {
    pub fn new(settings: Settings, references: R) -> Self {
        Self {
            settings,
            references,
            acquired: None,
            pending: None,
            generation: 0,
            drag_active: false,
            notice: None,
        }
    }

    pub fn references(&self) -> &R {
        &self.references
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn drag_active(&self) -> bool {
        self.drag_active
    }

    /// Last rejection or export failure, cleared by the next accepted file.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn state(&self) -> PageState {
        match (&self.pending, &self.acquired) {
            (Some(_), _) => PageState::Loading,
            (None, Some(_)) => PageState::Ready,
            (None, None) => PageState::Idle,
        }
    }

    pub fn view(&self) -> View<'_> {
        if self.pending.is_some() {
            return View::Loading;
        }
        match &self.acquired {
            Some(acquired) => View::Ready {
                image: &acquired.image,
                surface: &acquired.surface,
            },
            None => View::Idle,
        }
    }

    /// Reference to the uploaded image. Hidden while a new upload is loading.
    pub fn image(&self) -> Option<&str> {
        match self.view() {
            View::Ready { image, .. } => Some(image),
            _ => None,
        }
    }

    /// The string the visible QR code encodes.
    pub fn payload(&self) -> Option<&str> {
        self.surface().map(QrSurface::payload)
    }

    /// The rendered code, if one is visible.
    pub fn surface(&self) -> Option<&QrSurface> {
        match self.view() {
            View::Ready { surface, .. } => Some(surface),
            _ => None,
        }
    }

    /// Starts acquiring `file`. `None` (nothing picked or dropped) is ignored.
    ///
    /// Rejected files leave the page as it was and set the notice.
    pub fn accept_file(&mut self, file: Option<ImageFile>) -> Result<Option<Ticket>> {
        let Some(file) = file else {
            return Ok(None);
        };

        let format = validate(&file, self.settings.max_file_size).map_err(|err| self.reject(err))?;

        let generation = self.begin_acquire();
        Ok(Some(self.stage(generation, file, format)))
    }

    /// Enters `Loading` for a file whose bytes are not available yet and
    /// returns the generation to [`attach`](Page::attach) them under.
    ///
    /// Supersedes any upload already in flight.
    pub fn begin_acquire(&mut self) -> u64 {
        self.generation += 1;
        if let Some(stale) = self.pending.replace(Pending {
            generation: self.generation,
            staged: None,
        }) {
            tracing::debug!(generation = stale.generation, "superseded pending upload");
        }
        self.notice = None;

        tracing::debug!(generation = self.generation, "loading");
        self.generation
    }

    /// Hands over the bytes of the file picked under `generation`.
    ///
    /// Returns `Ok(None)` when another file was picked since. A rejected file
    /// cancels its own load.
    pub fn attach(&mut self, generation: u64, file: ImageFile) -> Result<Option<Ticket>> {
        if !self.is_current(generation) {
            tracing::debug!(
                file = %file.name,
                generation,
                current = self.generation,
                "discarded stale file"
            );
            return Ok(None);
        }

        match validate(&file, self.settings.max_file_size) {
            Ok(format) => Ok(Some(self.stage(generation, file, format))),
            Err(err) => Err(self.abandon(generation, err)),
        }
    }

    /// Cancels the load started under `generation`, e.g. because reading the
    /// file failed, and reports `err` to the user.
    pub fn abandon(&mut self, generation: u64, err: Error) -> Error {
        if self.is_current(generation) {
            self.pending = None;
        }
        self.reject(err)
    }

    /// Rejects a file by the size its host reports, before its bytes are read.
    pub fn check_size(&mut self, name: &str, size: u64) -> Result<()> {
        let limit = self.settings.max_file_size;
        if size > limit {
            return Err(self.reject(Error::too_large(name, size, limit)));
        }
        Ok(())
    }

    /// Records `err` as the user-visible notice and hands it back.
    pub fn reject(&mut self, err: Error) -> Error {
        tracing::warn!(error = %err, "upload rejected");
        self.notice = Some(err.to_string());
        err
    }

    fn is_current(&self, generation: u64) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| pending.generation == generation)
    }

    fn stage(&mut self, generation: u64, file: ImageFile, format: ImageFormat) -> Ticket {
        if let Some(pending) = self.pending.as_mut() {
            pending.staged = Some(Staged { file, format });
        }
        Ticket {
            generation,
            delay: self.settings.processing_delay,
        }
    }

    /// Finishes the upload started under `generation`.
    ///
    /// Returns `Ok(false)` when a newer upload has been accepted since, or the
    /// file's bytes have not been attached yet. Nothing changes in that case.
    pub fn complete(&mut self, generation: u64) -> Result<bool> {
        let Some(Pending {
            staged: Some(Staged { file, format }),
            ..
        }) = self
            .pending
            .take_if(|pending| pending.generation == generation && pending.staged.is_some())
        else {
            tracing::debug!(generation, current = self.generation, "discarded stale completion");
            return Ok(false);
        };

        let name = file.name.clone();
        let inline = match self.settings.payload_mode {
            PayloadMode::Reference => None,
            PayloadMode::Inline => Some(data_url(&file, format)),
        };

        if let Some(previous) = self.acquired.take() {
            self.references.release(&previous.image);
        }

        let image = match self.references.create(file) {
            Ok(image) => image,
            Err(err) => return Err(self.reject(err)),
        };
        let payload = inline.as_deref().unwrap_or(&image);

        let surface = match render_qr(payload, self.settings.qr_size) {
            Ok(surface) => surface,
            Err(err) => {
                self.references.release(&image);
                return Err(self.reject(err));
            }
        };

        tracing::info!(file = %name, image = %image, "QR code ready");
        self.acquired = Some(Acquired { image, surface });
        Ok(true)
    }

    /// Applies a drag event to the drop target and returns the dropped file,
    /// if any, for the caller to pass to [`Page::accept_file`].
    pub fn handle_drag<F>(&mut self, event: DragEvent<F>) -> Option<F> {
        match event {
            DragEvent::Enter | DragEvent::Over => {
                self.drag_active = true;
                None
            }
            DragEvent::Leave => {
                self.drag_active = false;
                None
            }
            DragEvent::Drop(file) => {
                self.drag_active = false;
                file
            }
        }
    }

    /// Serializes the visible QR code to PNG and hands it to `saver`.
    pub fn download_qr(&mut self, saver: &mut impl FileSaver) -> Result<()> {
        let result = match self.surface() {
            Some(surface) => surface
                .to_png()
                .and_then(|png| saver.save(&png, &self.settings.download_name)),
            None => Err(Error::ExportUnavailable),
        };

        if let Err(err) = &result {
            tracing::warn!(error = %err, "download failed");
            self.notice = Some(err.to_string());
        }
        result
    }
}

impl<R: ReferenceProvider> Drop for Page<R> {
    fn drop(&mut self) {
        if let Some(acquired) = self.acquired.take() {
            self.references.release(&acquired.image);
        }
    }
}

/// Typed by the sniffed format; the host's MIME hint may be wrong.
fn data_url(file: &ImageFile, format: ImageFormat) -> String {
    format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        BASE64.encode(&file.bytes)
    )
}
