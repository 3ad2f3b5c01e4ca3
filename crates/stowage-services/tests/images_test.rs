mod helpers;

use helpers::{jpeg, setup, setup_with, transparent_png};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use stowage_core::{ThumbnailSize, Visibility};
use stowage_services::{PipelineError, RawInput, Stowage, ThumbnailCache, UploadRequest};
use stowage_storage::{DiskManager, LocalStorage};

async fn store(app: &helpers::TestApp, data: Vec<u8>, name: &str, mime: &str) -> String {
    app.stowage
        .upload(
            RawInput::named_bytes(data, name, mime),
            &UploadRequest::new("images").with_filename(name),
        )
        .await
        .expect("upload failed")
        .file
        .path
}

fn age_cache_entries(app: &helpers::TestApp, by: Duration) {
    for entry in std::fs::read_dir(&app.cache_root).unwrap() {
        let path = entry.unwrap().path();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }
}

#[tokio::test]
async fn test_thumbnail_generated_then_cached() {
    let app = setup().await;
    let path = store(&app, jpeg(120, 80), "photo.jpg", "image/jpeg").await;

    let first = app.stowage.get_image(&path, Some(40), Some(40)).await.unwrap();
    assert!(!first.from_cache);
    assert_eq!(first.content_type, "image/jpeg");

    let decoded = image::load_from_memory(&first.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (40, 40));

    let second = app.stowage.get_image(&path, Some(40), Some(40)).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.data, first.data);
    assert_eq!(second.content_type, "image/jpeg");

    let key = ThumbnailCache::cache_key(&format!("local:{}", path), 40, 40);
    assert!(app.cache_root.join(format!("{}.jpg", key)).is_file());
}

#[tokio::test]
async fn test_same_path_on_two_disks_cached_separately() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config = helpers::test_config(
        &temp_dir.path().join("storage"),
        &temp_dir.path().join("cache"),
    );
    let mut disks = DiskManager::from_config(&config.storage).await.unwrap();
    let other = LocalStorage::new(
        temp_dir.path().join("other"),
        "https://other.example.com".to_string(),
        Visibility::Public,
    )
    .await
    .unwrap();
    disks.register("other", Arc::new(other));
    let stowage = Stowage::new(config, disks);

    for (disk, source) in [("local", jpeg(60, 60)), ("other", helpers::transparent_png(60, 60))] {
        stowage
            .upload(
                RawInput::named_bytes(source, "shared.img", "application/octet-stream"),
                &UploadRequest::new("images")
                    .on_disk(disk)
                    .with_filename("shared.img")
                    .without_scan(),
            )
            .await
            .unwrap();
    }

    let local = stowage.get_image("images/shared.img", Some(20), Some(20)).await.unwrap();
    assert!(!local.from_cache);
    assert_eq!(local.content_type, "image/jpeg");

    let other = stowage
        .get_image_from("other", "images/shared.img", Some(20), Some(20))
        .await
        .unwrap();
    assert!(!other.from_cache);
    assert_eq!(other.content_type, "image/png");
    assert_ne!(other.data, local.data);

    let again = stowage
        .get_image_from("local", "images/shared.img", Some(20), Some(20))
        .await
        .unwrap();
    assert!(again.from_cache);
    assert_eq!(again.data, local.data);
}

#[tokio::test]
async fn test_single_dimension_gives_square_thumbnail() {
    let app = setup().await;
    let path = store(&app, jpeg(100, 50), "wide.jpg", "image/jpeg").await;

    let response = app.stowage.get_image(&path, Some(30), None).await.unwrap();
    let decoded = image::load_from_memory(&response.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (30, 30));

    let response = app.stowage.get_image(&path, None, Some(30)).await.unwrap();
    assert!(response.from_cache);
}

#[tokio::test]
async fn test_png_thumbnail_keeps_format() {
    let app = setup().await;
    let path = store(&app, transparent_png(32, 32), "icon.png", "image/png").await;

    let response = app.stowage.get_image(&path, Some(8), Some(8)).await.unwrap();
    assert_eq!(response.content_type, "image/png");

    let key = ThumbnailCache::cache_key(&format!("local:{}", path), 8, 8);
    assert!(app.cache_root.join(format!("{}.png", key)).is_file());
}

#[tokio::test]
async fn test_no_dimensions_returns_original() {
    let app = setup().await;
    let data = jpeg(20, 20);
    let path = store(&app, data.clone(), "orig.jpg", "image/jpeg").await;

    let response = app.stowage.get_image(&path, None, None).await.unwrap();
    assert!(!response.from_cache);
    assert_eq!(response.data, data);
    assert_eq!(response.content_type, "image/jpeg");
    assert_eq!(app.stowage.get_cache_stats().await.total, 0);
}

#[tokio::test]
async fn test_invalid_dimensions() {
    let app = setup_with(|config| {
        config.thumbnails.max_width = 100;
        config.thumbnails.max_height = 100;
    })
    .await;
    let path = store(&app, jpeg(20, 20), "small.jpg", "image/jpeg").await;

    for (w, h) in [(0, 10), (101, 10), (10, 101)] {
        let err = app.stowage.get_image(&path, Some(w), Some(h)).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidDimensions(_)), "{}x{}", w, h);
    }
}

#[tokio::test]
async fn test_strict_sizes_only_allow_listed() {
    let app = setup_with(|config| {
        config.thumbnails.allowed_sizes = vec![ThumbnailSize::new(16, 16)];
        config.thumbnails.strict_sizes = true;
    })
    .await;
    let path = store(&app, jpeg(64, 64), "square.jpg", "image/jpeg").await;

    assert!(app.stowage.get_image(&path, Some(16), Some(16)).await.is_ok());
    let err = app.stowage.get_image(&path, Some(20), Some(20)).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidDimensions(_)));
    assert!(app.stowage.validate_dimensions(16, 16).is_ok());
}

#[tokio::test]
async fn test_missing_source_is_not_found() {
    let app = setup().await;

    let err = app
        .stowage
        .get_image("images/ghost.jpg", Some(50), Some(50))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(app.stowage.get_cache_stats().await.total, 0);
}

#[tokio::test]
async fn test_undecodable_source() {
    let app = setup().await;
    let path = app
        .stowage
        .upload(
            RawInput::named_bytes(b"plain text, not pixels".to_vec(), "notes.txt", "text/plain"),
            &UploadRequest::new("docs"),
        )
        .await
        .unwrap()
        .file
        .path;

    let err = app.stowage.get_image(&path, Some(10), Some(10)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Transform(_)));
}

#[tokio::test]
async fn test_cache_stats_and_clear_expired() {
    let app = setup().await;
    let path = store(&app, jpeg(40, 40), "a.jpg", "image/jpeg").await;

    app.stowage.get_image(&path, Some(10), Some(10)).await.unwrap();
    app.stowage.get_image(&path, Some(20), Some(20)).await.unwrap();

    let stats = app.stowage.get_cache_stats().await;
    assert_eq!(stats.total, 2);
    assert_eq!(stats.expired, 0);
    assert!(stats.size > 0);
    assert_eq!(stats.ttl, 86_400);

    assert_eq!(app.stowage.clear_expired_cache().await, 0);

    age_cache_entries(&app, Duration::from_secs(2 * 86_400));
    assert_eq!(app.stowage.get_cache_stats().await.expired, 2);
    assert_eq!(app.stowage.clear_expired_cache().await, 2);
    assert_eq!(app.stowage.clear_expired_cache().await, 0);
    assert_eq!(app.stowage.get_cache_stats().await.total, 0);
}

#[tokio::test]
async fn test_stale_entry_is_regenerated() {
    let app = setup().await;
    let path = store(&app, jpeg(40, 40), "b.jpg", "image/jpeg").await;

    app.stowage.get_image(&path, Some(10), Some(10)).await.unwrap();
    age_cache_entries(&app, Duration::from_secs(2 * 86_400));

    let response = app.stowage.get_image(&path, Some(10), Some(10)).await.unwrap();
    assert!(!response.from_cache);
    assert_eq!(app.stowage.get_cache_stats().await.expired, 0);
}

#[tokio::test]
async fn test_clear_all_cache() {
    let app = setup().await;
    let path = store(&app, jpeg(40, 40), "c.jpg", "image/jpeg").await;

    app.stowage.get_image(&path, Some(10), Some(10)).await.unwrap();
    app.stowage.get_image(&path, Some(12), Some(12)).await.unwrap();

    assert_eq!(app.stowage.clear_all_cache().await, 2);
    assert_eq!(app.stowage.clear_all_cache().await, 0);

    let response = app.stowage.get_image(&path, Some(10), Some(10)).await.unwrap();
    assert!(!response.from_cache);
}

#[tokio::test]
async fn test_clear_on_missing_cache_dir() {
    let app = setup().await;

    assert_eq!(app.stowage.clear_expired_cache().await, 0);
    assert_eq!(app.stowage.clear_all_cache().await, 0);
    assert_eq!(app.stowage.get_cache_stats().await.total, 0);
}
