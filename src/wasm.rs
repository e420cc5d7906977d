use js_sys::{Array, Function, Uint8Array};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{console, Blob, BlobPropertyBag, HtmlAnchorElement, Url};

use crate::error::{Error, Result};
use crate::export::FileSaver;
use crate::page::{Page, PageState, Ticket};
use crate::reference::ReferenceProvider;
use crate::settings::Settings;
use crate::upload::{DragEvent, ImageFile};

fn host_err(err: JsValue) -> Error {
    Error::Host(format!("{:?}", err))
}

fn to_js(err: Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn blob_from(bytes: &[u8], mime: &str) -> Result<Blob> {
    let parts = Array::of1(&Uint8Array::from(bytes));
    let options = BlobPropertyBag::new();
    options.set_type(mime);
    Blob::new_with_u8_array_sequence_and_options(&parts, &options).map_err(host_err)
}

/// `URL.createObjectURL` references.
#[derive(Debug, Default)]
pub struct BlobUrls;

impl ReferenceProvider for BlobUrls {
    fn create(&mut self, file: ImageFile) -> Result<String> {
        let blob = blob_from(&file.bytes, &file.mime)?;
        Url::create_object_url_with_blob(&blob).map_err(host_err)
    }

    fn release(&mut self, reference: &str) {
        if let Err(err) = Url::revoke_object_url(reference) {
            console::warn_1(&err);
        }
    }
}

/// Triggers a browser download through a temporary `<a download>` link.
#[derive(Debug, Default)]
pub struct AnchorDownload;

impl FileSaver for AnchorDownload {
    fn save(&mut self, bytes: &[u8], filename: &str) -> Result<()> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| Error::Host("no document".to_string()))?;
        let body = document
            .body()
            .ok_or_else(|| Error::Host("no document body".to_string()))?;

        let blob = blob_from(bytes, "image/png")?;
        let url = Url::create_object_url_with_blob(&blob).map_err(host_err)?;

        let link: HtmlAnchorElement = document
            .create_element("a")
            .map_err(host_err)?
            .dyn_into()
            .map_err(|_| Error::Host("created element is not an anchor".to_string()))?;
        link.set_href(&url);
        link.set_download(filename);

        body.append_child(&link).map_err(host_err)?;
        link.click();
        body.remove_child(&link).map_err(host_err)?;

        Url::revoke_object_url(&url).map_err(host_err)
    }
}

struct Shared {
    page: Page<BlobUrls>,
    on_change: Option<Function>,
}

type Handle = Rc<RefCell<Shared>>;

fn notify(handle: &Handle) {
    // Clone out first: the callback usually reads the page again
    let callback = handle.borrow().on_change.clone();
    if let Some(callback) = callback {
        if let Err(err) = callback.call0(&JsValue::NULL) {
            console::error_1(&err);
        }
    }
}

fn attach(handle: &Handle, generation: u64, read: Result<ImageFile>) {
    let attached = {
        let mut shared = handle.borrow_mut();
        let page = &mut shared.page;
        match read {
            Ok(file) => page.attach(generation, file),
            Err(err) => Err(page.abandon(generation, err)),
        }
    };
    match attached {
        Ok(Some(ticket)) => schedule(handle, ticket),
        Ok(None) => {}
        Err(err) => console::warn_1(&to_js(err)),
    }
    notify(handle);
}

fn schedule(handle: &Handle, ticket: Ticket) {
    let Some(window) = web_sys::window() else {
        console::error_1(&JsValue::from_str("no window to schedule on"));
        return;
    };

    let shared = handle.clone();
    let callback = Closure::once_into_js(move || {
        let completed = shared.borrow_mut().page.complete(ticket.generation);
        if let Err(err) = completed {
            console::warn_1(&to_js(err));
        }
        notify(&shared);
    });

    let delay = i32::try_from(ticket.delay.as_millis()).unwrap_or(i32::MAX);
    if let Err(err) =
        window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay)
    {
        console::error_1(&err);
    }
}

async fn read_file(file: web_sys::File) -> Result<ImageFile> {
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(host_err)?;
    let bytes = Uint8Array::new(&buffer).to_vec();
    Ok(ImageFile::new(file.name(), file.type_(), bytes))
}

/// The upload page, bound to DOM events.
///
/// Wire the file input's `change` to `select_file`, the drop target's
/// `dragenter`/`dragover`/`dragleave`/`drop` to `drag`, and re-render from
/// the getters inside the `on_change` callback.
#[wasm_bindgen]
pub struct QrPage {
    shared: Handle,
}

#[wasm_bindgen]
impl QrPage {
    #[wasm_bindgen(constructor)]
    pub fn new() -> QrPage {
        console_error_panic_hook::set_once();
        QrPage {
            shared: Rc::new(RefCell::new(Shared {
                page: Page::new(Settings::default(), BlobUrls),
                on_change: None,
            })),
        }
    }

    pub fn set_on_change(&self, callback: Function) {
        self.shared.borrow_mut().on_change = Some(callback);
    }

    pub fn select_file(&self, file: Option<web_sys::File>) {
        let Some(file) = file else {
            return;
        };

        // Checked before the bytes are copied into wasm memory
        let checked = self
            .shared
            .borrow_mut()
            .page
            .check_size(&file.name(), file.size() as u64);
        if let Err(err) = checked {
            console::warn_1(&to_js(err));
            notify(&self.shared);
            return;
        }

        // The generation is taken at pick time so the last pick wins even if
        // an earlier, larger file finishes reading later
        let generation = self.shared.borrow_mut().page.begin_acquire();
        notify(&self.shared);

        let shared = self.shared.clone();
        spawn_local(async move {
            let read = read_file(file).await;
            attach(&shared, generation, read);
        });
    }

    pub fn drag(&self, event: web_sys::DragEvent) {
        // Keep the browser from opening the dropped file
        event.prevent_default();
        event.stop_propagation();

        let kind = event.type_();
        let parsed = if kind == "drop" {
            let file = event
                .data_transfer()
                .and_then(|transfer| transfer.files())
                .and_then(|files| files.get(0));
            DragEvent::Drop(file)
        } else {
            match DragEvent::from_kind(&kind) {
                Some(parsed) => parsed,
                None => return,
            }
        };

        let dropped = self.shared.borrow_mut().page.handle_drag(parsed);
        notify(&self.shared);

        if dropped.is_some() {
            self.select_file(dropped);
        }
    }

    pub fn state(&self) -> String {
        match self.shared.borrow().page.state() {
            PageState::Idle => "idle",
            PageState::Loading => "loading",
            PageState::Ready => "ready",
        }
        .to_string()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.borrow().page.is_loading()
    }

    pub fn drag_active(&self) -> bool {
        self.shared.borrow().page.drag_active()
    }

    pub fn image_url(&self) -> Option<String> {
        self.shared.borrow().page.image().map(str::to_string)
    }

    pub fn payload(&self) -> Option<String> {
        self.shared.borrow().page.payload().map(str::to_string)
    }

    pub fn notice(&self) -> Option<String> {
        self.shared.borrow().page.notice().map(str::to_string)
    }

    pub fn qr_png(&self) -> std::result::Result<Vec<u8>, JsValue> {
        let shared = self.shared.borrow();
        let surface = shared.page.surface().ok_or_else(|| to_js(Error::ExportUnavailable))?;
        surface.to_png().map_err(to_js)
    }

    pub fn download_qr(&self) -> std::result::Result<(), JsValue> {
        let result = self.shared.borrow_mut().page.download_qr(&mut AnchorDownload);
        notify(&self.shared);
        result.map_err(to_js)
    }
}
