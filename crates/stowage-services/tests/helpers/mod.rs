//! Test helpers: build a `Stowage` over temporary directories.
//!
//! Run from workspace root: `cargo test -p stowage-services`.

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::PathBuf;
use stowage_core::{Config, DiskConfig, StorageConfig};
use stowage_services::Stowage;
use tempfile::TempDir;

pub const BASE_URL: &str = "http://localhost:3000/files";

/// Test application: the facade plus the directories it owns.
pub struct TestApp {
    pub stowage: Stowage,
    pub storage_root: PathBuf,
    pub cache_root: PathBuf,
    pub _temp_dir: TempDir,
}

pub async fn setup() -> TestApp {
    setup_with(|_| {}).await
}

/// Like [`setup`], with a chance to adjust the configuration first
pub async fn setup_with<F>(configure: F) -> TestApp
where
    F: FnOnce(&mut Config),
{
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let storage_root = temp_dir.path().join("storage");
    let cache_root = temp_dir.path().join("cache");

    let mut config = test_config(&storage_root, &cache_root);
    configure(&mut config);

    let stowage = Stowage::from_config(config)
        .await
        .expect("Failed to build Stowage");

    TestApp {
        stowage,
        storage_root,
        cache_root,
        _temp_dir: temp_dir,
    }
}

pub fn test_config(storage_root: &std::path::Path, cache_root: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.storage = StorageConfig::default();
    config
        .storage
        .disks
        .insert("local".to_string(), DiskConfig::local(storage_root, BASE_URL));
    config.cache.path = cache_root.to_path_buf();
    config
}

pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format)
        .expect("Failed to encode test image");
    buffer
}

/// Opaque two-tone JPEG
pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbImage::from_pixel(width, height, Rgb([30, 90, 160]));
    for (x, _, pixel) in img.enumerate_pixels_mut() {
        if x >= width / 2 {
            *pixel = Rgb([220, 200, 40]);
        }
    }
    encode(&DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

/// PNG with a transparent corner
pub fn transparent_png(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]));
    img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
    encode(&DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

/// Windows PE header padded to a plausible size
pub fn pe_header() -> Vec<u8> {
    let mut data = b"MZ\x90\x00\x03\x00\x00\x00\x04\x00\x00\x00\xFF\xFF".to_vec();
    data.resize(256, 0);
    data
}
