mod helpers;

use base64::Engine;
use helpers::{jpeg, pe_header, setup, transparent_png, BASE_URL};
use std::sync::Arc;
use stowage_core::{DriverKind, Visibility};
use stowage_services::{
    PipelineError, RawInput, Stowage, ThumbnailSpec, TransformOptions, UploadRequest,
    ValidationRules,
};
use stowage_storage::{DiskManager, LocalStorage};

#[tokio::test]
async fn test_upload_round_trip() {
    let app = setup().await;
    let data = jpeg(64, 48);

    let descriptor = app
        .stowage
        .upload(
            RawInput::named_bytes(data.clone(), "photo.jpg", "image/jpeg"),
            &UploadRequest::new("uploads"),
        )
        .await
        .expect("upload failed");

    assert!(descriptor.file.path.starts_with("uploads/"));
    assert!(descriptor.file.path.ends_with(".jpg"));
    assert_eq!(descriptor.file.size, data.len() as u64);
    assert_eq!(descriptor.file.mime_type, "image/jpeg");
    assert_eq!(descriptor.file.driver, DriverKind::Local);
    assert_eq!(descriptor.original_name, "photo.jpg");
    assert_eq!(
        descriptor.file.url,
        format!("{}/{}", BASE_URL, descriptor.file.path)
    );
    assert!(descriptor.thumbnails.is_empty());
    assert!(descriptor.image.is_none());

    let downloaded = app
        .stowage
        .download(&descriptor.file.path, None)
        .await
        .unwrap();
    assert_eq!(downloaded, data);
    assert!(app.storage_root.join(&descriptor.file.path).is_file());
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let app = setup().await;

    let err = app
        .stowage
        .upload(
            RawInput::named_bytes(vec![0xAB; 10], "tiny.jpg", "image/jpeg"),
            &UploadRequest::new("uploads").with_rules(ValidationRules::default().with_max_size(5)),
        )
        .await
        .unwrap_err();

    match err {
        PipelineError::Validation(e) => assert!(e.has_rule("max_size")),
        other => panic!("expected a validation error, got {:?}", other),
    }
    assert!(app.stowage.list_files("uploads", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_dangerous_extension() {
    let app = setup().await;

    let err = app
        .stowage
        .upload(
            RawInput::named_bytes(b"harmless looking text".to_vec(), "evil.exe", "text/plain"),
            &UploadRequest::new("uploads"),
        )
        .await
        .unwrap_err();

    match err {
        PipelineError::Security(e) => assert!(e.has_rule("dangerous_extension")),
        other => panic!("expected a security error, got {:?}", other),
    }
    assert!(app.stowage.list_files("", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_executable_disguised_as_image() {
    let app = setup().await;

    let err = app
        .stowage
        .upload(
            RawInput::named_bytes(pe_header(), "photo.jpg", "image/jpeg"),
            &UploadRequest::new("uploads"),
        )
        .await
        .unwrap_err();

    match err {
        PipelineError::Security(e) => assert!(e.has_rule("executable")),
        other => panic!("expected a security error, got {:?}", other),
    }
    assert!(app.stowage.list_files("", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scan_can_be_skipped_per_call() {
    let app = setup().await;

    let result = app
        .stowage
        .upload(
            RawInput::named_bytes(pe_header(), "tool.bin", "application/octet-stream"),
            &UploadRequest::new("bin").without_scan(),
        )
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_scan_disabled_globally() {
    let app = helpers::setup_with(|config| config.security.scan_enabled = false).await;

    let result = app
        .stowage
        .upload(
            RawInput::named_bytes(pe_header(), "tool.bin", "application/octet-stream"),
            &UploadRequest::new("bin"),
        )
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_upload_multiple_collects_errors() {
    let app = setup().await;
    let request = UploadRequest::new("batch").with_rules(ValidationRules::images());

    let result = app
        .stowage
        .upload_multiple(
            vec![
                RawInput::named_bytes(jpeg(8, 8), "a.jpg", "image/jpeg"),
                RawInput::named_bytes(b"not an image".to_vec(), "notes.txt", "text/plain"),
                RawInput::named_bytes(jpeg(8, 8), "b.jpg", "image/jpeg"),
            ],
            &request,
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.results.len(), 2);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].index, 1);
    assert!(matches!(result.errors[0].error, PipelineError::Validation(_)));
    assert_eq!(app.stowage.list_files("batch", None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_upload_multiple_all_succeed() {
    let app = setup().await;

    let result = app
        .stowage
        .upload_multiple(
            vec![
                RawInput::named_bytes(jpeg(8, 8), "a.jpg", "image/jpeg"),
                RawInput::named_bytes(jpeg(8, 8), "b.jpg", "image/jpeg"),
            ],
            &UploadRequest::new("batch"),
        )
        .await;

    assert!(result.success);
    assert!(result.errors.is_empty());
    assert_ne!(result.results[0].file.path, result.results[1].file.path);
}

#[tokio::test]
async fn test_upload_data_uri() {
    let app = setup().await;
    let data = transparent_png(4, 4);
    let uri = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&data)
    );

    let descriptor = app
        .stowage
        .upload(RawInput::data_uri(uri), &UploadRequest::new("inline"))
        .await
        .unwrap();

    assert_eq!(descriptor.file.mime_type, "image/png");
    assert!(descriptor.file.path.ends_with(".png"));
    assert_eq!(app.stowage.download(&descriptor.file.path, None).await.unwrap(), data);
}

#[tokio::test]
async fn test_upload_malformed_data_uri() {
    let app = setup().await;

    let err = app
        .stowage
        .upload(
            RawInput::data_uri("data:image/png;base64,@@@not-base64@@@"),
            &UploadRequest::new("inline"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Input(_)));
}

#[tokio::test]
async fn test_upload_with_processing_and_thumbnail() {
    let app = setup().await;
    let options = TransformOptions {
        thumbnails: vec![ThumbnailSpec::new("thumb", 16, 16)],
        ..TransformOptions::default()
    };

    let descriptor = app
        .stowage
        .upload(
            RawInput::named_bytes(jpeg(64, 32), "landscape.jpg", "image/jpeg"),
            &UploadRequest::new("photos")
                .with_filename("landscape.jpg")
                .with_processing(options),
        )
        .await
        .unwrap();

    assert_eq!(descriptor.file.path, "photos/landscape.jpg");
    assert_eq!(descriptor.thumbnails.len(), 1);
    assert_eq!(descriptor.thumbnails[0].path, "photos/landscape_thumb.jpg");

    let image = descriptor.image.expect("image metadata");
    assert_eq!((image.width, image.height), (64, 32));

    let thumb = app
        .stowage
        .download("photos/landscape_thumb.jpg", None)
        .await
        .unwrap();
    let decoded = image::load_from_memory(&thumb).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (16, 16));
}

#[tokio::test]
async fn test_processing_keeps_alpha_out_of_jpeg() {
    let app = setup().await;
    let options = TransformOptions {
        format: Some(stowage_processing::OutputFormat::Jpeg),
        ..TransformOptions::default()
    };

    let descriptor = app
        .stowage
        .upload(
            RawInput::named_bytes(transparent_png(8, 8), "logo.png", "image/png"),
            &UploadRequest::new("logos")
                .with_filename("logo.png")
                .with_processing(options),
        )
        .await
        .unwrap();

    assert_eq!(descriptor.file.path, "logos/logo.png");
    assert_eq!(descriptor.file.mime_type, "image/png");
}

#[tokio::test]
async fn test_upload_sanitizes_filename() {
    let app = setup().await;

    let descriptor = app
        .stowage
        .upload(
            RawInput::named_bytes(b"hello".to_vec(), "notes.txt", "text/plain"),
            &UploadRequest::new("docs").with_filename("../../my notes.txt"),
        )
        .await
        .unwrap();

    assert_eq!(descriptor.file.path, "docs/my_notes.txt");
    assert!(app.storage_root.join("docs/my_notes.txt").is_file());
}

#[tokio::test]
async fn test_upload_stores_custom_metadata_and_visibility() {
    let app = setup().await;
    let mut request = UploadRequest::new("private").with_filename("secret.txt");
    request.visibility = Some(Visibility::Private);
    request
        .metadata
        .insert("owner".to_string(), "tenant-1".to_string());

    let descriptor = app
        .stowage
        .upload(
            RawInput::named_bytes(b"top secret".to_vec(), "secret.txt", "text/plain"),
            &request,
        )
        .await
        .unwrap();

    assert_eq!(descriptor.file.path, "private/secret.txt");
    assert!(app.stowage.exists("private/secret.txt", None).await.unwrap());
}

#[tokio::test]
async fn test_delete_reports_absence() {
    let app = setup().await;
    let descriptor = app
        .stowage
        .upload(
            RawInput::named_bytes(b"bye".to_vec(), "bye.txt", "text/plain"),
            &UploadRequest::new("tmp"),
        )
        .await
        .unwrap();

    assert!(app.stowage.delete(&descriptor.file.path, None).await.unwrap());
    assert!(!app.stowage.delete(&descriptor.file.path, None).await.unwrap());
    assert!(!app.stowage.exists(&descriptor.file.path, None).await.unwrap());
}

#[tokio::test]
async fn test_exists_url_and_metadata() {
    let app = setup().await;
    let descriptor = app
        .stowage
        .upload(
            RawInput::named_bytes(jpeg(8, 8), "a.jpg", "image/jpeg"),
            &UploadRequest::new("meta").with_filename("a.jpg"),
        )
        .await
        .unwrap();

    assert!(app.stowage.exists("meta/a.jpg", None).await.unwrap());
    assert_eq!(
        app.stowage.url("meta/a.jpg", None).unwrap(),
        format!("{}/meta/a.jpg", BASE_URL)
    );

    let metadata = app.stowage.get_metadata("meta/a.jpg", None).await.unwrap();
    assert_eq!(metadata.size, descriptor.file.size);
    assert_eq!(metadata.mime_type, "image/jpeg");
    assert!(metadata.last_modified.is_some());
}

#[tokio::test]
async fn test_missing_object_is_not_found() {
    let app = setup().await;

    let err = app
        .stowage
        .get_metadata("nowhere/missing.jpg", None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = app.stowage.download("nowhere/missing.jpg", None).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_path_traversal_rejected() {
    let app = setup().await;

    assert!(app.stowage.download("../outside.txt", None).await.is_err());
    assert!(app.stowage.delete("../outside.txt", None).await.is_err());
}

#[tokio::test]
async fn test_unknown_disk() {
    let app = setup().await;

    let err = app
        .stowage
        .upload(
            RawInput::named_bytes(b"x".to_vec(), "x.txt", "text/plain"),
            &UploadRequest::new("a").on_disk("archive"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Storage(_)));
    assert!(app.stowage.exists("a/x.txt", Some("archive")).await.is_err());
}

#[tokio::test]
async fn test_registered_custom_disk() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config = helpers::test_config(
        &temp_dir.path().join("storage"),
        &temp_dir.path().join("cache"),
    );

    let mut disks = DiskManager::from_config(&config.storage).await.unwrap();
    let archive = LocalStorage::new(
        temp_dir.path().join("archive"),
        "https://archive.example.com".to_string(),
        Visibility::Public,
    )
    .await
    .unwrap();
    disks.register("archive", Arc::new(archive));
    let stowage = Stowage::new(config, disks);

    let descriptor = stowage
        .upload(
            RawInput::named_bytes(b"old".to_vec(), "old.txt", "text/plain"),
            &UploadRequest::new("2020").on_disk("archive").with_filename("old.txt"),
        )
        .await
        .unwrap();

    assert_eq!(descriptor.file.url, "https://archive.example.com/2020/old.txt");
    assert!(stowage.exists("2020/old.txt", Some("archive")).await.unwrap());
    assert!(!stowage.exists("2020/old.txt", None).await.unwrap());
}
