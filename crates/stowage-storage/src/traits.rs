//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use stowage_core::{DriverKind, ErrorMetadata, LogLevel, ObjectMetadata, StoredObject, Visibility};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Operation not supported by this disk: {0}")]
    Unsupported(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl ErrorMetadata for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            StorageError::NotFound(_) => "NOT_FOUND",
            StorageError::InvalidKey(_) => "INVALID_PATH",
            StorageError::PermissionDenied(_) => "PERMISSION_DENIED",
            StorageError::Unsupported(_) => "UNSUPPORTED",
            StorageError::ConfigError(_) => "STORAGE_CONFIG_ERROR",
            _ => "STORAGE_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound(_) | StorageError::InvalidKey(_) | StorageError::Unsupported(_)
        )
    }

    fn client_message(&self) -> String {
        match self {
            StorageError::NotFound(_)
            | StorageError::InvalidKey(_)
            | StorageError::Unsupported(_) => self.to_string(),
            _ => "Storage operation failed".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            StorageError::NotFound(_) | StorageError::InvalidKey(_) => LogLevel::Debug,
            StorageError::Unsupported(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

/// Per-object write options
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub mime_type: String,
    /// User metadata stored alongside the object where the backend supports it
    pub metadata: BTreeMap<String, String>,
    /// Overrides the disk's default visibility
    pub visibility: Option<Visibility>,
}

impl UploadOptions {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            metadata: BTreeMap::new(),
            visibility: None,
        }
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }
}

/// Storage abstraction trait
///
/// All storage backends (S3-compatible stores, local filesystem, custom disks) must
/// implement this trait so the upload pipeline can work with any of them.
///
/// Not-found is part of the normal contract: `delete` and `exists` answer `false`,
/// while `download` and `get_metadata` return [`StorageError::NotFound`].
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` at `path`, replacing any existing object
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StorageResult<StoredObject>;

    /// Download an object by its path
    async fn download(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Delete an object. Returns `false` if it was already absent.
    async fn delete(&self, path: &str) -> StorageResult<bool>;

    /// Check if an object exists
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Public URL for an object. Does not check that the object exists.
    fn url(&self, path: &str) -> StorageResult<String>;

    async fn get_metadata(&self, path: &str) -> StorageResult<ObjectMetadata>;

    /// List every object whose path starts with `prefix` (empty for all)
    ///
    /// The match is on the plain string, not on path segments: `docs/ph`
    /// matches `docs/photo.txt` and `uploads` matches `uploads2/a.txt`.
    /// Results are sorted by path.
    async fn list_files(&self, prefix: &str) -> StorageResult<Vec<ObjectMetadata>>;

    /// Time-limited GET URL for private content
    ///
    /// Only object stores can sign URLs; other backends return
    /// [`StorageError::Unsupported`].
    async fn signed_url(&self, path: &str, expires_in: Duration) -> StorageResult<String>;

    /// Get the storage driver kind
    fn driver(&self) -> DriverKind;
}
