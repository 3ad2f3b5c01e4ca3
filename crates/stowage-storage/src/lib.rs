//! Stowage Storage Library
//!
//! This crate provides the storage abstraction and its implementations: the local
//! filesystem and S3-compatible object stores (AWS S3, DigitalOcean Spaces, MinIO and
//! other custom endpoints).
//!
//! # Storage key format
//!
//! Keys are plain relative paths such as `uploads/2024/photo.jpg`. They must not be
//! empty, contain `..` segments, or start with `/`. Key handling is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::{create_disk, DiskManager};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use stowage_core::{DriverKind, ObjectMetadata, StoredObject, Visibility};
pub use traits::{Storage, StorageError, StorageResult, UploadOptions};
