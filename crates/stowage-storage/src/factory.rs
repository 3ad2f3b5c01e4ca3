#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{DriverKind, Storage, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use stowage_core::{DiskConfig, StorageConfig};

const DEFAULT_LOCAL_URL: &str = "/storage";

/// Create a storage backend for one disk configuration
pub async fn create_disk(config: &DiskConfig) -> StorageResult<Arc<dyn Storage>> {
    match config.driver {
        #[cfg(feature = "storage-s3")]
        DriverKind::S3 | DriverKind::Spaces => {
            let storage = S3Storage::new(config).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        DriverKind::S3 | DriverKind::Spaces => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        DriverKind::Local => {
            let base_path = config.root.clone().ok_or_else(|| {
                StorageError::ConfigError("Local disk root not configured".to_string())
            })?;
            let base_url = config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCAL_URL.to_string());

            let storage = LocalStorage::new(base_path, base_url, config.visibility).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        DriverKind::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        DriverKind::Custom => Err(StorageError::ConfigError(
            "Custom disks must be registered with DiskManager::register".to_string(),
        )),
    }
}

/// Registry of named disks
///
/// Built once at startup; custom drivers are registered by the embedding application.
#[derive(Clone)]
pub struct DiskManager {
    default_disk: String,
    disks: BTreeMap<String, Arc<dyn Storage>>,
}

impl DiskManager {
    /// Empty registry whose default disk is `default_disk`
    pub fn new(default_disk: impl Into<String>) -> Self {
        Self {
            default_disk: default_disk.into(),
            disks: BTreeMap::new(),
        }
    }

    /// Construct every configured disk except `custom` ones, which are left for
    /// [`DiskManager::register`].
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let mut manager = Self::new(config.default_disk.clone());

        for (name, disk) in &config.disks {
            if disk.driver == DriverKind::Custom {
                tracing::debug!(disk = %name, "Skipping custom disk; awaiting registration");
                continue;
            }

            let storage = create_disk(disk).await?;
            tracing::info!(disk = %name, driver = %disk.driver, "Storage disk initialized");
            manager.disks.insert(name.clone(), storage);
        }

        Ok(manager)
    }

    /// Add or replace a disk
    pub fn register(&mut self, name: impl Into<String>, storage: Arc<dyn Storage>) {
        self.disks.insert(name.into(), storage);
    }

    /// Resolve a disk by name, or the default disk when `name` is `None`
    pub fn disk(&self, name: Option<&str>) -> StorageResult<Arc<dyn Storage>> {
        let name = name.unwrap_or(&self.default_disk);
        self.disks
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::ConfigError(format!("Disk '{}' is not configured", name)))
    }

    pub fn default_disk_name(&self) -> &str {
        &self.default_disk
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.disks.keys().map(String::as_str)
    }
}
