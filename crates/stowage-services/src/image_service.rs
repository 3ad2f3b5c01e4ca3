use std::sync::Arc;
use stowage_core::{mime, ThumbnailConfig, ThumbnailSize};
use stowage_processing::{ImageTransformer, OutputFormat};
use stowage_storage::DiskManager;

use crate::error::PipelineError;
use crate::thumbnail_cache::ThumbnailCache;

/// Bytes served by [`ImageService::get_image`]
#[derive(Debug, Clone, PartialEq)]
pub struct ImageResponse {
    pub data: Vec<u8>,
    pub from_cache: bool,
    pub content_type: String,
}

/// On-demand thumbnails backed by the [`ThumbnailCache`]
pub struct ImageService {
    disks: Arc<DiskManager>,
    cache: Arc<ThumbnailCache>,
    config: ThumbnailConfig,
}

impl ImageService {
    pub fn new(disks: Arc<DiskManager>, cache: Arc<ThumbnailCache>, config: ThumbnailConfig) -> Self {
        Self {
            disks,
            cache,
            config,
        }
    }

    /// Original image when no dimension is given, otherwise a thumbnail
    ///
    /// A single given side is used for both, giving a square thumbnail.
    /// Thumbnails are looked up in the cache first, keyed by `{disk}:{path}`;
    /// on a miss they are derived from the source on `disk`, cached and returned.
    pub async fn get_image(
        &self,
        path: &str,
        width: Option<u32>,
        height: Option<u32>,
        disk: Option<&str>,
    ) -> Result<ImageResponse, PipelineError> {
        let storage = self.disks.disk(disk)?;

        let (width, height) = match (width, height) {
            (None, None) => {
                let data = storage.download(path).await?;
                return Ok(ImageResponse {
                    content_type: content_type_of(&data, path),
                    data,
                    from_cache: false,
                });
            }
            (Some(w), None) => (w, w),
            (None, Some(h)) => (h, h),
            (Some(w), Some(h)) => (w, h),
        };

        self.validate_dimensions(width, height)?;

        // Same path on different disks are different sources
        let source_key = format!("{}:{}", disk.unwrap_or(self.disks.default_disk_name()), path);
        if let Some(data) = self.cache.get(&source_key, width, height).await {
            return Ok(ImageResponse {
                content_type: content_type_of(&data, path),
                data,
                from_cache: true,
            });
        }

        let source = storage.download(path).await?;
        let (fit, position, quality) = (self.config.fit, self.config.position, self.config.quality);
        let thumbnail = tokio::task::spawn_blocking(move || {
            ImageTransformer::thumbnail(&source, width, height, fit, position, quality)
        })
        .await??;

        let key = ThumbnailCache::cache_key(&source_key, width, height);
        self.cache.put(&key, &thumbnail.data).await;

        tracing::debug!(
            path = %path,
            width = width,
            height = height,
            size_bytes = thumbnail.data.len(),
            "Thumbnail generated"
        );

        Ok(ImageResponse {
            content_type: thumbnail.mime_type().to_string(),
            data: thumbnail.data,
            from_cache: false,
        })
    }

    /// Reject zero sizes, sizes above the configured maxima and, in strict
    /// mode, sizes not in the allow-list
    pub fn validate_dimensions(&self, width: u32, height: u32) -> Result<(), PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidDimensions(format!(
                "{}x{}: width and height must be positive",
                width, height
            )));
        }

        if width > self.config.max_width || height > self.config.max_height {
            return Err(PipelineError::InvalidDimensions(format!(
                "{}x{} exceeds the maximum of {}x{}",
                width, height, self.config.max_width, self.config.max_height
            )));
        }

        if self.config.strict_sizes
            && !self
                .config
                .allowed_sizes
                .contains(&ThumbnailSize::new(width, height))
        {
            let allowed = self
                .config
                .allowed_sizes
                .iter()
                .map(|s| format!("{}x{}", s.width, s.height))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(PipelineError::InvalidDimensions(format!(
                "{}x{} is not an allowed size (allowed: {})",
                width, height, allowed
            )));
        }

        Ok(())
    }
}

fn content_type_of(data: &[u8], path: &str) -> String {
    OutputFormat::detect(data)
        .map(|format| format.to_mime_type())
        .unwrap_or_else(|| mime::mime_for_path(path))
        .to_string()
}
