//! Stowage Processing Library
//!
//! Everything that inspects or rewrites file content before it is persisted:
//! declarative validation, content-based security scanning and the image pipeline.

pub mod compression;
pub mod error;
pub mod image;
pub mod metadata;
pub mod security;
pub mod transformer;
pub mod validator;

pub use compression::{FormatSelector, ImageCompressor, OutputFormat};
pub use error::TransformError;
pub use metadata::ImageMetadata;
pub use security::{ScanResult, SecurityScanner, VirusScanner};
pub use transformer::{
    EncodedImage, ImageTransformer, ProcessedImage, ThumbnailSpec, TransformOptions,
};
pub use validator::{DimensionBounds, FileValidator, ValidationRules};
