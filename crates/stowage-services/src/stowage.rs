use std::sync::Arc;
use std::time::Duration;
use stowage_core::{Config, ObjectMetadata, RawInput};
use stowage_processing::SecurityScanner;
use stowage_storage::{DiskManager, Storage};

use crate::error::PipelineError;
use crate::image_service::{ImageResponse, ImageService};
use crate::thumbnail_cache::{CacheStats, ThumbnailCache};
use crate::upload::{BatchUploadResult, UploadDescriptor, UploadRequest, UploadService};

/// Public entry points of the pipeline
///
/// Holds the immutable per-disk configuration and the thumbnail cache; every
/// call is otherwise independent.
pub struct Stowage {
    disks: Arc<DiskManager>,
    cache: Arc<ThumbnailCache>,
    uploads: UploadService,
    images: ImageService,
}

impl Stowage {
    /// Validate `config` and construct every configured disk
    pub async fn from_config(config: Config) -> Result<Self, PipelineError> {
        config
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        let disks = DiskManager::from_config(&config.storage).await?;
        Ok(Self::new(config, disks))
    }

    /// Build over an existing disk registry, e.g. one with custom disks registered
    pub fn new(config: Config, disks: DiskManager) -> Self {
        let disks = Arc::new(disks);
        let cache = Arc::new(ThumbnailCache::from_config(&config.cache));

        let scanner = config.security.scan_enabled.then(|| {
            let scanner = SecurityScanner::new(config.security.max_size_bytes);
            Arc::new(with_external_scanner(scanner, &config))
        });

        Self {
            uploads: UploadService::new(disks.clone(), scanner),
            images: ImageService::new(disks.clone(), cache.clone(), config.thumbnails.clone()),
            disks,
            cache,
        }
    }

    pub fn disks(&self) -> &DiskManager {
        &self.disks
    }

    pub fn cache(&self) -> &ThumbnailCache {
        &self.cache
    }

    fn disk(&self, disk: Option<&str>) -> Result<Arc<dyn Storage>, PipelineError> {
        Ok(self.disks.disk(disk)?)
    }

    pub async fn upload(
        &self,
        input: RawInput,
        request: &UploadRequest,
    ) -> Result<UploadDescriptor, PipelineError> {
        self.uploads.upload(input, request).await
    }

    pub async fn upload_multiple(
        &self,
        inputs: Vec<RawInput>,
        request: &UploadRequest,
    ) -> BatchUploadResult {
        self.uploads.upload_multiple(inputs, request).await
    }

    /// `false` when the object was already absent
    pub async fn delete(&self, path: &str, disk: Option<&str>) -> Result<bool, PipelineError> {
        Ok(self.disk(disk)?.delete(path).await?)
    }

    pub async fn exists(&self, path: &str, disk: Option<&str>) -> Result<bool, PipelineError> {
        Ok(self.disk(disk)?.exists(path).await?)
    }

    pub fn url(&self, path: &str, disk: Option<&str>) -> Result<String, PipelineError> {
        Ok(self.disk(disk)?.url(path)?)
    }

    pub async fn signed_url(
        &self,
        path: &str,
        expires_in: Duration,
        disk: Option<&str>,
    ) -> Result<String, PipelineError> {
        Ok(self.disk(disk)?.signed_url(path, expires_in).await?)
    }

    pub async fn download(&self, path: &str, disk: Option<&str>) -> Result<Vec<u8>, PipelineError> {
        Ok(self.disk(disk)?.download(path).await?)
    }

    pub async fn get_metadata(
        &self,
        path: &str,
        disk: Option<&str>,
    ) -> Result<ObjectMetadata, PipelineError> {
        Ok(self.disk(disk)?.get_metadata(path).await?)
    }

    pub async fn list_files(
        &self,
        prefix: &str,
        disk: Option<&str>,
    ) -> Result<Vec<ObjectMetadata>, PipelineError> {
        Ok(self.disk(disk)?.list_files(prefix).await?)
    }

    /// Original image, or a cached/derived thumbnail, from the default disk
    pub async fn get_image(
        &self,
        path: &str,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<ImageResponse, PipelineError> {
        self.images.get_image(path, width, height, None).await
    }

    pub async fn get_image_from(
        &self,
        disk: &str,
        path: &str,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<ImageResponse, PipelineError> {
        self.images.get_image(path, width, height, Some(disk)).await
    }

    pub fn validate_dimensions(&self, width: u32, height: u32) -> Result<(), PipelineError> {
        self.images.validate_dimensions(width, height)
    }

    pub async fn get_cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear_expired_cache(&self) -> usize {
        self.cache.clear_expired().await
    }

    pub async fn clear_all_cache(&self) -> usize {
        self.cache.clear_all().await
    }
}

#[cfg(feature = "clamav")]
fn with_external_scanner(scanner: SecurityScanner, config: &Config) -> SecurityScanner {
    match &config.security.clamav {
        Some(clamav) => {
            tracing::info!(host = %clamav.host, port = clamav.port, "ClamAV scanning enabled");
            scanner.with_virus_scanner(Arc::new(crate::clamav::ClamAvScanner::from_config(clamav)))
        }
        None => scanner,
    }
}

#[cfg(not(feature = "clamav"))]
fn with_external_scanner(scanner: SecurityScanner, config: &Config) -> SecurityScanner {
    if config.security.clamav.is_some() {
        tracing::warn!("ClamAV configured but the clamav feature is disabled");
    }
    scanner
}
