//! Stowage Services Layer
//!
//! Orchestration over the storage and processing crates: the upload pipeline,
//! on-demand thumbnails with their cache, and the optional ClamAV scanner.
//! [`Stowage`] bundles them behind the public entry points.

#[cfg(feature = "clamav")]
pub mod clamav;
pub mod error;
pub mod image_service;
pub mod stowage;
pub mod thumbnail_cache;
pub mod upload;

#[cfg(feature = "clamav")]
pub use clamav::ClamAvScanner;
pub use error::PipelineError;
pub use image_service::{ImageResponse, ImageService};
pub use stowage::Stowage;
pub use thumbnail_cache::{CacheStats, ThumbnailCache};
pub use upload::{
    sanitize_filename, unique_name, BatchError, BatchUploadResult, UploadDescriptor,
    UploadRequest, UploadService,
};

pub use stowage_core::{Config, FileBlob, RawInput, StoredObject, UploadedFile};
pub use stowage_processing::{
    DimensionBounds, OutputFormat, ScanResult, SecurityScanner, ThumbnailSpec,
    TransformOptions, ValidationRules, VirusScanner,
};
pub use stowage_storage::{DiskManager, Storage, StorageError};
