use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::fs;
use std::io::Cursor;
use std::time::Duration;
use tempfile::TempDir;

use snapqr::{
    DirectorySaver, DragEvent, Error, ImageFile, MemoryStore, Page, PageState, Settings, View,
};

fn photo_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 251) as u8])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("Failed to encode test image");
    bytes
}

fn write_photo(dir: &std::path::Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, photo_bytes(640, 480, ImageFormat::Jpeg)).expect("Failed to write photo");
    path
}

#[test]
#[cfg(feature = "decode")]
fn test_photo_upload_download_roundtrip() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let photo_path = write_photo(temp_dir.path(), "photo.jpg");
    let download_dir = temp_dir.path().join("downloads");

    let mut page = Page::new(Settings::default(), MemoryStore::new());

    let file = ImageFile::from_path(&photo_path).expect("Failed to read photo");
    assert_eq!(file.name, "photo.jpg");
    assert_eq!(file.mime, "image/jpeg");
    let original = file.bytes.clone();

    let ticket = page
        .accept_file(Some(file))
        .expect("Upload rejected")
        .expect("Upload ignored");
    assert_eq!(ticket.delay, Duration::from_millis(800));
    assert!(matches!(page.view(), View::Loading));

    assert!(page.complete(ticket.generation).expect("Completion failed"));

    let image = page.image().expect("No image after completion").to_string();
    assert_eq!(page.payload(), Some(image.as_str()));

    // The preview resolves to the uploaded pixels
    let uploaded = page.references().resolve(&image).expect("Reference not live");
    assert_eq!(uploaded.bytes, original);
    let preview = image::load_from_memory(&uploaded.bytes).expect("Preview undecodable");
    assert_eq!((preview.width(), preview.height()), (640, 480));

    let mut saver = DirectorySaver::new(&download_dir);
    page.download_qr(&mut saver).expect("Download failed");

    let saved = download_dir.join("qrcode.png");
    assert_eq!(saver.saved(), &[saved.clone()]);

    let png = fs::read(&saved).expect("Failed to read download");
    assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);

    let decoded = snapqr::decode_qr_image(&saved).expect("Failed to decode QR code");
    assert_eq!(decoded, image);
}

#[test]
#[cfg(feature = "decode")]
fn test_overlapping_uploads_last_one_wins() {
    let mut page = Page::new(Settings::default(), MemoryStore::new());

    let first = ImageFile::new("first.png", "image/png", photo_bytes(8, 8, ImageFormat::Png));
    let second = ImageFile::new("second.jpg", "", photo_bytes(8, 8, ImageFormat::Jpeg));

    let t1 = page.accept_file(Some(first)).unwrap().unwrap();
    let t2 = page.accept_file(Some(second)).unwrap().unwrap();
    assert!(t2.generation > t1.generation);

    assert!(page.complete(t2.generation).unwrap());
    assert!(!page.complete(t1.generation).unwrap());

    let image = page.image().unwrap();
    assert_eq!(page.references().resolve(image).unwrap().name, "second.jpg");

    let png = page.surface().unwrap().to_png().unwrap();
    assert_eq!(snapqr::decode_qr_png(&png).unwrap(), image);
}

#[test]
fn test_loading_and_result_never_overlap() {
    let mut page = Page::new(Settings::default(), MemoryStore::new());
    let check = |page: &Page<MemoryStore>| {
        assert!(!(page.is_loading() && page.surface().is_some()));
        assert_eq!(page.is_loading(), page.state() == PageState::Loading);
    };

    check(&page);
    for round in 0..3 {
        let file = ImageFile::new(
            format!("img{}.png", round),
            "image/png",
            photo_bytes(4, 4, ImageFormat::Png),
        );
        let ticket = page.accept_file(Some(file)).unwrap().unwrap();
        check(&page);
        page.complete(ticket.generation).unwrap();
        check(&page);
    }
    assert_eq!(page.references().live(), 1);
}

#[test]
fn test_drop_sequence_acquires_once() {
    let mut page = Page::new(Settings::default(), MemoryStore::new());
    let file = ImageFile::new("x.png", "image/png", photo_bytes(4, 4, ImageFormat::Png));

    let mut accepted = Vec::new();
    for event in [
        DragEvent::Enter,
        DragEvent::Over,
        DragEvent::Drop(Some(file.clone())),
    ] {
        let dropped = page.handle_drag(event);
        if let Some(ticket) = page.accept_file(dropped).unwrap() {
            accepted.push(ticket);
        }
    }

    assert!(!page.drag_active());
    assert_eq!(accepted.len(), 1);
    assert!(page.complete(accepted[0].generation).unwrap());
    assert_eq!(
        page.references().resolve(page.image().unwrap()),
        Some(&file)
    );
}

#[test]
fn test_rejected_upload_reports_reason() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let text_path = temp_dir.path().join("notes.txt");
    fs::write(&text_path, "not an image").unwrap();

    let mut page = Page::new(Settings::default(), MemoryStore::new());
    let file = ImageFile::from_path(&text_path).unwrap();

    let err = page.accept_file(Some(file)).unwrap_err();
    assert!(matches!(err, Error::UnsupportedType { .. }));
    assert_eq!(page.state(), PageState::Idle);
    assert!(page.notice().unwrap().contains("notes.txt"));

    let mut saver = DirectorySaver::new(temp_dir.path().join("downloads"));
    assert!(matches!(
        page.download_qr(&mut saver),
        Err(Error::ExportUnavailable)
    ));
    assert!(!saver.dir().exists());
}
