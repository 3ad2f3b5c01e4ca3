//! Stowage Core Library
//!
//! This crate provides the domain types, error types and configuration shared by
//! the storage, processing and service crates.

pub mod config;
pub mod error;
pub mod format;
pub mod image_types;
pub mod mime;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{
    CacheConfig, ClamAvConfig, Config, DiskConfig, SecurityConfig, StorageConfig,
    ThumbnailConfig, ThumbnailSize,
};
pub use error::{
    ErrorMetadata, InputError, LogLevel, SecurityError, ValidationError, Violation,
};
pub use format::format_bytes;
pub use image_types::{Anchor, FitMode};
pub use models::{FileBlob, ObjectMetadata, RawInput, StoredObject, UploadedFile};
pub use storage_types::{DriverKind, Visibility};
