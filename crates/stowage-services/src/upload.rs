//! Upload pipeline
//!
//! parse → validate → scan → transform → name → persist → describe
//!
//! Every step before persisting may reject the file, so a rejected upload never
//! leaves bytes behind. Thumbnails are best effort: a thumbnail that fails to
//! store is logged and the main file is still returned.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use stowage_core::{FileBlob, RawInput, StoredObject, Visibility};
use stowage_processing::{
    FileValidator, ImageMetadata, ImageTransformer, SecurityScanner, TransformOptions,
    ValidationRules,
};
use stowage_storage::{keys, DiskManager, UploadOptions};

use crate::error::PipelineError;

const MAX_FILENAME_LENGTH: usize = 255;
const FALLBACK_FILENAME: &str = "file";

/// Per-call upload options
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Target disk; `None` for the default disk
    pub disk: Option<String>,
    /// Directory prefix inside the disk, e.g. `uploads/avatars`
    pub path: String,
    /// Stored file name; a unique name is generated when absent
    pub filename: Option<String>,
    pub validate: bool,
    pub rules: ValidationRules,
    pub scan: bool,
    /// Image pipeline options, applied to image uploads only
    pub process: Option<TransformOptions>,
    pub metadata: BTreeMap<String, String>,
    pub visibility: Option<Visibility>,
}

impl Default for UploadRequest {
    fn default() -> Self {
        Self {
            disk: None,
            path: String::new(),
            filename: None,
            validate: true,
            rules: ValidationRules::default(),
            scan: true,
            process: None,
            metadata: BTreeMap::new(),
            visibility: None,
        }
    }
}

impl UploadRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn on_disk(mut self, disk: impl Into<String>) -> Self {
        self.disk = Some(disk.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.validate = true;
        self.rules = rules;
        self
    }

    pub fn with_processing(mut self, options: TransformOptions) -> Self {
        self.process = Some(options);
        self
    }

    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    pub fn without_scan(mut self) -> Self {
        self.scan = false;
        self
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadDescriptor {
    #[serde(flatten)]
    pub file: StoredObject,
    pub original_name: String,
    pub thumbnails: Vec<StoredObject>,
    /// Present when the image pipeline ran
    pub image: Option<ImageMetadata>,
}

#[derive(Debug)]
pub struct BatchError {
    pub index: usize,
    pub error: PipelineError,
}

#[derive(Debug)]
pub struct BatchUploadResult {
    pub results: Vec<UploadDescriptor>,
    pub errors: Vec<BatchError>,
    pub success: bool,
}

pub struct UploadService {
    disks: Arc<DiskManager>,
    scanner: Option<Arc<SecurityScanner>>,
}

impl UploadService {
    /// `scanner` is `None` when scanning is disabled globally
    pub fn new(disks: Arc<DiskManager>, scanner: Option<Arc<SecurityScanner>>) -> Self {
        Self { disks, scanner }
    }

    pub async fn upload(
        &self,
        input: RawInput,
        request: &UploadRequest,
    ) -> Result<UploadDescriptor, PipelineError> {
        let start = Instant::now();
        let storage = self.disks.disk(request.disk.as_deref())?;
        let blob = FileBlob::from_input(input)?;

        if request.validate {
            FileValidator::validate(&blob, &request.rules)?;
        }

        if request.scan {
            if let Some(scanner) = &self.scanner {
                scanner.scan(&blob).await?;
            }
        }

        let original_name = blob.original_name().to_string();
        let (main, main_mime, extension, thumbnails, image) = match &request.process {
            Some(options) if blob.is_image() => {
                let options = options.clone();
                let data = blob.into_data();
                let processed = tokio::task::spawn_blocking(move || {
                    ImageTransformer::process(&data, &options)
                })
                .await??;

                let main_mime = processed.main.mime_type().to_string();
                let extension = Some(processed.main.extension().to_string());
                (
                    processed.main.data,
                    main_mime,
                    extension,
                    processed.thumbnails,
                    Some(processed.metadata),
                )
            }
            _ => {
                let mime_type = blob.declared_mime_type().to_string();
                let extension = blob.extension();
                (blob.into_data(), mime_type, extension, Vec::new(), None)
            }
        };

        let name = match &request.filename {
            Some(filename) => {
                let sanitized = sanitize_filename(filename);
                match (&image, extension.as_deref()) {
                    // The image pipeline may have changed the format
                    (Some(_), Some(ext)) => replace_extension(&sanitized, ext),
                    _ => sanitized,
                }
            }
            None => unique_name(extension.as_deref()),
        };
        let path = keys::join(&request.path, &name);

        let mut options = UploadOptions::new(main_mime).with_metadata(request.metadata.clone());
        if let Some(visibility) = request.visibility {
            options = options.with_visibility(visibility);
        }
        let file = storage.upload(&path, main, &options).await?;

        let mut stored_thumbnails = Vec::with_capacity(thumbnails.len());
        for (suffix, thumb) in thumbnails {
            let thumb_path = keys::with_suffix(&path, &suffix, thumb.extension());
            let mut thumb_options = UploadOptions::new(thumb.mime_type());
            if let Some(visibility) = request.visibility {
                thumb_options = thumb_options.with_visibility(visibility);
            }

            match storage.upload(&thumb_path, thumb.data, &thumb_options).await {
                Ok(stored) => stored_thumbnails.push(stored),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %thumb_path,
                        "Failed to store thumbnail, keeping main upload"
                    );
                }
            }
        }

        tracing::info!(
            path = %file.path,
            original_name = %original_name,
            size_bytes = file.size,
            mime_type = %file.mime_type,
            thumbnails = stored_thumbnails.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File uploaded"
        );

        Ok(UploadDescriptor {
            file,
            original_name,
            thumbnails: stored_thumbnails,
            image,
        })
    }

    /// Upload each input in turn; one failure never aborts the batch
    ///
    /// With a fixed `filename` every file targets the same path, so callers
    /// normally leave it unset for batches.
    pub async fn upload_multiple(
        &self,
        inputs: Vec<RawInput>,
        request: &UploadRequest,
    ) -> BatchUploadResult {
        let mut results = Vec::with_capacity(inputs.len());
        let mut errors = Vec::new();

        for (index, input) in inputs.into_iter().enumerate() {
            match self.upload(input, request).await {
                Ok(descriptor) => results.push(descriptor),
                Err(error) => {
                    tracing::debug!(index = index, error = %error, "Batch item failed");
                    errors.push(BatchError { index, error });
                }
            }
        }

        let success = errors.is_empty();
        BatchUploadResult {
            results,
            errors,
            success,
        }
    }
}

/// Reduce a client-supplied name to a safe final path component
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');

    if sanitized.trim_matches('_').is_empty() {
        return FALLBACK_FILENAME.to_string();
    }
    sanitized.to_string()
}

/// `{unix_millis}-{8 hex chars}{.ext}`
pub fn unique_name(extension: Option<&str>) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let random: u32 = rand::random();
    match extension.filter(|ext| !ext.is_empty()) {
        Some(ext) => format!("{}-{:08x}.{}", timestamp, random, ext),
        None => format!("{}-{:08x}", timestamp, random),
    }
}

fn replace_extension(filename: &str, extension: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };
    format!("{}.{}", stem, extension)
}
