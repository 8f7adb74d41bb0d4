//! End-to-end pipeline tests over the real codec and the JSON file store.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use image::{DynamicImage, ImageBuffer, Rgb};
use image_recoder::{
    Codec, CompressionSettings, ConverterApp, JsonFileStore, MemoryStore, NativeCodec,
    OutputFormat, SourceImage,
};

static DIR_SEQ: AtomicU32 = AtomicU32::new(0);

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "image-recoder-{}-{}-{}",
        label,
        std::process::id(),
        DIR_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

fn jpeg_source(name: &str, width: u32, height: u32) -> SourceImage {
    let mut bytes = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 90);
    encoder.encode_image(&gradient(width, height).to_rgb8()).unwrap();
    SourceImage::new(bytes, name, "image/jpeg")
}

#[tokio::test]
async fn large_jpeg_lands_bounded_and_as_webp() {
    let mut app = ConverterApp::open(Box::new(MemoryStore::new())).unwrap();
    app.update_settings(CompressionSettings::new(1_048_576, 1920, 0.8))
        .unwrap();

    let outcome = app
        .convert(vec![jpeg_source("holiday.jpg", 3000, 2000)], true)
        .await
        .unwrap();

    assert_eq!(outcome.artifacts.len(), 1);
    let artifact = &outcome.artifacts[0];
    assert_eq!(artifact.output_name, "holiday.webp");

    let decoded = NativeCodec::new()
        .decode(&artifact.output_bytes, "image/webp")
        .unwrap();
    assert_eq!(decoded.width().max(decoded.height()), 1920);

    // The budget is a target; either it was met, or the outcome says so.
    if outcome.budget_unmet == 0 {
        assert!(artifact.output_size_bytes <= 1_048_576);
    }
}

#[tokio::test]
async fn non_image_in_a_batch_is_isolated() {
    let mut app = ConverterApp::open(Box::new(MemoryStore::new())).unwrap();

    let outcome = app
        .convert(
            vec![
                SourceImage::new(b"PK\x03\x04 zip header".to_vec(), "notes.zip", "application/zip"),
                jpeg_source("real.jpg", 800, 600),
            ],
            true,
        )
        .await
        .unwrap();

    assert_eq!(outcome.artifacts.len(), 1);
    assert_eq!(outcome.artifacts[0].output_name, "real.webp");
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].name, "notes.zip");
    // The failed item produced zero ledger entries.
    assert_eq!(app.history().len(), 1);
}

#[tokio::test]
async fn ledger_survives_a_restart() {
    let dir = temp_dir("restart");

    let converted_id = {
        let mut app = ConverterApp::open(Box::new(JsonFileStore::new(&dir))).unwrap();
        let outcome = app
            .convert(vec![jpeg_source("keep.jpg", 640, 480)], true)
            .await
            .unwrap();
        outcome.artifacts[0].id.clone()
    };

    // A fresh process sees the record, without the session-scoped bytes.
    let mut app = ConverterApp::open(Box::new(JsonFileStore::new(&dir))).unwrap();
    assert_eq!(app.history().len(), 1);
    assert_eq!(app.history()[0].id, converted_id);
    assert_eq!(app.history()[0].output_name, "keep.webp");
    assert!(app.artifact(&converted_id).is_none());

    // Removal persists too.
    app.remove_from_history(&converted_id).unwrap();
    let app = ConverterApp::open(Box::new(JsonFileStore::new(&dir))).unwrap();
    assert!(app.history().is_empty());

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn settings_survive_a_restart() {
    let dir = temp_dir("settings");

    {
        let mut app = ConverterApp::open(Box::new(JsonFileStore::new(&dir))).unwrap();
        app.update_settings(CompressionSettings::new(2_097_152, 1000, 0.55))
            .unwrap();
    }

    let app = ConverterApp::open(Box::new(JsonFileStore::new(&dir))).unwrap();
    let settings = app.settings();
    assert_eq!(settings.max_output_bytes, 2_097_152);
    assert_eq!(settings.max_dimension_px, 1000);
    assert!((settings.quality - 0.55).abs() < 1e-6);

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn target_codec_is_configurable() {
    let mut app = ConverterApp::with_codec(
        Box::new(MemoryStore::new()),
        std::sync::Arc::new(NativeCodec::new()),
        OutputFormat::JPEG,
    )
    .unwrap();

    let outcome = app
        .convert(vec![jpeg_source("photo.jpeg", 320, 240)], true)
        .await
        .unwrap();

    assert_eq!(outcome.artifacts[0].output_name, "photo.jpg");
    NativeCodec::new()
        .decode(&outcome.artifacts[0].output_bytes, "image/jpeg")
        .unwrap();
}
