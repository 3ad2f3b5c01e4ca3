use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult, UploadOptions};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ClientOptions, ObjectMeta, ObjectStore, ObjectStoreExt, PutOptions,
    PutPayload, Result as ObjectResult,
};
use std::time::Duration;
use stowage_core::mime::mime_for_path;
use stowage_core::{DiskConfig, DriverKind, ObjectMetadata, StoredObject, Visibility};

const ACL_HEADER: &str = "x-amz-acl";

/// S3-compatible storage implementation
///
/// Serves AWS S3, DigitalOcean Spaces and any other endpoint speaking the S3 API
/// (MinIO, R2, ...).
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    cdn_url: Option<String>,
    url_template: Option<String>,
    visibility: Visibility,
    driver: DriverKind,
}

impl S3Storage {
    /// Create a new S3Storage instance from a disk configuration
    ///
    /// Credentials fall back to the standard `AWS_*` environment variables when the
    /// disk does not name them. Spaces disks without an explicit endpoint use the
    /// regional `https://{region}.digitaloceanspaces.com` endpoint.
    pub async fn new(config: &DiskConfig) -> StorageResult<Self> {
        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| StorageError::ConfigError("Bucket not configured".to_string()))?;

        let endpoint_url = match (&config.endpoint, config.driver) {
            (Some(endpoint), _) => Some(endpoint.clone()),
            (None, DriverKind::Spaces) => config
                .region
                .as_ref()
                .map(|region| format!("https://{}.digitaloceanspaces.com", region)),
            (None, _) => None,
        };

        let region = config
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(ACL_HEADER),
            HeaderValue::from_static(config.visibility.acl()),
        );

        // Build AmazonS3 object store from environment and explicit settings.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone())
            .with_client_options(ClientOptions::new().with_default_headers(headers));

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder
                .with_access_key_id(key_id.clone())
                .with_secret_access_key(secret.clone());
        }

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
            cdn_url: config.cdn_url.clone(),
            url_template: config.url.clone(),
            visibility: config.visibility,
            driver: config.driver,
        })
    }

    /// Generate public URL for an object
    ///
    /// Preference order: CDN hostname, configured URL base, the custom endpoint
    /// (path-style `{endpoint}/{bucket}/{key}`), then the standard AWS format
    /// `https://{bucket}.s3.{region}.amazonaws.com/{key}`.
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref cdn) = self.cdn_url {
            format!("{}/{}", cdn.trim_end_matches('/'), key)
        } else if let Some(ref base) = self.url_template {
            format!("{}/{}", base.trim_end_matches('/'), key)
        } else if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    fn to_metadata(&self, meta: ObjectMeta) -> ObjectMetadata {
        let key = meta.location.to_string();
        ObjectMetadata {
            url: self.generate_url(&key),
            mime_type: mime_for_path(&key).to_string(),
            size: meta.size as u64,
            last_modified: Some(meta.last_modified),
            path: key,
        }
    }

    fn put_options(&self, options: &UploadOptions) -> PutOptions {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, options.mime_type.clone().into());
        for (key, value) in &options.metadata {
            attributes.insert(Attribute::Metadata(key.clone().into()), value.clone().into());
        }

        PutOptions {
            attributes,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StorageResult<StoredObject> {
        validate_key(path)?;

        // Per-object visibility overrides are not supported; the ACL header is set per client.
        if options.visibility.is_some_and(|v| v != self.visibility) {
            tracing::warn!(
                bucket = %self.bucket,
                key = %path,
                disk_visibility = ?self.visibility,
                "Per-object visibility override ignored by object store disk"
            );
        }

        let size = data.len() as u64;
        let bytes = Bytes::from(data);
        let location = Path::from(path.to_string());

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(bytes), self.put_options(options))
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %path,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            match e {
                ObjectStoreError::PermissionDenied { .. } | ObjectStoreError::Unauthenticated { .. } => {
                    StorageError::PermissionDenied(path.to_string())
                }
                other => StorageError::UploadFailed(other.to_string()),
            }
        })?;

        let url = self.generate_url(path);

        tracing::info!(
            bucket = %self.bucket,
            key = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(StoredObject {
            path: path.to_string(),
            url,
            size,
            mime_type: options.mime_type.clone(),
            driver: self.driver,
        })
    }

    async fn download(&self, path: &str) -> StorageResult<Vec<u8>> {
        validate_key(path)?;
        let start = std::time::Instant::now();
        let location = Path::from(path.to_string());

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(path.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
        let size = bytes.len() as u64;

        tracing::info!(
            bucket = %self.bucket,
            key = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes.to_vec())
    }

    async fn delete(&self, path: &str) -> StorageResult<bool> {
        if !self.exists(path).await? {
            return Ok(false);
        }

        let start = std::time::Instant::now();
        let location = Path::from(path.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %path,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            StorageError::DeleteFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(true)
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        validate_key(path)?;
        let location = Path::from(path.to_string());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn url(&self, path: &str) -> StorageResult<String> {
        validate_key(path)?;
        Ok(self.generate_url(path))
    }

    async fn get_metadata(&self, path: &str) -> StorageResult<ObjectMetadata> {
        validate_key(path)?;
        let location = Path::from(path.to_string());
        match self.store.head(&location).await {
            Ok(meta) => Ok(self.to_metadata(meta)),
            Err(ObjectStoreError::NotFound { .. }) => Err(StorageError::NotFound(path.to_string())),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn list_files(&self, prefix: &str) -> StorageResult<Vec<ObjectMetadata>> {
        let prefix = prefix.trim_start_matches('/');
        if !prefix.is_empty() {
            validate_key(prefix)?;
        }

        // object_store lists whole path segments, so list the parent and filter by full prefix.
        let location = prefix
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .filter(|dir| !dir.is_empty())
            .map(|dir| Path::from(dir.to_string()));

        let objects: Vec<ObjectMeta> = self
            .store
            .list(location.as_ref())
            .try_collect()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        let mut files: Vec<ObjectMetadata> = objects
            .into_iter()
            .filter(|meta| meta.location.as_ref().starts_with(prefix))
            .map(|meta| self.to_metadata(meta))
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    async fn signed_url(&self, path: &str, expires_in: Duration) -> StorageResult<String> {
        validate_key(path)?;
        let location = Path::from(path.to_string());
        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::GET, &location, expires_in)
            .await;

        let url = url_result
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .to_string();

        Ok(url)
    }

    fn driver(&self) -> DriverKind {
        self.driver
    }
}
