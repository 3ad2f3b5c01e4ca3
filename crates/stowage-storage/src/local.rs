use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult, UploadOptions};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stowage_core::mime::mime_for_path;
use stowage_core::{DriverKind, ObjectMetadata, StoredObject, Visibility};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    visibility: Visibility,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/stowage/app")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:3000/files")
    /// * `visibility` - Default visibility of written files
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        visibility: Visibility,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            visibility,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys that could escape the base storage directory, including through
    /// symlinks inside it.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        // The target may not exist yet; check the deepest ancestor that does.
        let mut existing = path.as_path();
        let canonical = loop {
            match existing.canonicalize() {
                Ok(canonical) => break canonical,
                Err(_) => match existing.parent() {
                    Some(parent) => existing = parent,
                    None => break base_canonical.clone(),
                },
            }
        };

        if canonical.strip_prefix(&base_canonical).is_err() {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    /// Generate public URL for file
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    #[cfg(unix)]
    async fn apply_visibility(path: &Path, visibility: Visibility) -> StorageResult<()> {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, std::fs::Permissions::from_mode(visibility.file_mode()))
            .await
            .map_err(|e| map_io_error(e, path))
    }

    #[cfg(not(unix))]
    async fn apply_visibility(_path: &Path, _visibility: Visibility) -> StorageResult<()> {
        Ok(())
    }

    fn to_metadata(&self, key: String, meta: &std::fs::Metadata) -> ObjectMetadata {
        ObjectMetadata {
            url: self.generate_url(&key),
            mime_type: mime_for_path(&key).to_string(),
            size: meta.len(),
            last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            path: key,
        }
    }
}

fn map_io_error(e: std::io::Error, path: &Path) -> StorageError {
    match e.kind() {
        ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
        ErrorKind::PermissionDenied => StorageError::PermissionDenied(path.display().to_string()),
        _ => StorageError::IoError(e),
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StorageResult<StoredObject> {
        let file_path = self.key_to_path(path)?;
        let size = data.len() as u64;
        let visibility = options.visibility.unwrap_or(self.visibility);

        self.ensure_parent_dir(&file_path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&file_path).await.map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => {
                StorageError::PermissionDenied(file_path.display().to_string())
            }
            _ => StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                file_path.display(),
                e
            )),
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to sync file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        Self::apply_visibility(&file_path, visibility).await?;

        let url = self.generate_url(path);

        tracing::info!(
            path = %file_path.display(),
            key = %path,
            size_bytes = size,
            visibility = ?visibility,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(StoredObject {
            path: path.to_string(),
            url,
            size,
            mime_type: options.mime_type.clone(),
            driver: DriverKind::Local,
        })
    }

    async fn download(&self, path: &str) -> StorageResult<Vec<u8>> {
        let file_path = self.key_to_path(path)?;
        let start = std::time::Instant::now();

        let data = fs::read(&file_path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            ErrorKind::PermissionDenied => StorageError::PermissionDenied(path.to_string()),
            _ => StorageError::DownloadFailed(format!(
                "Failed to read file {}: {}",
                file_path.display(),
                e
            )),
        })?;

        tracing::info!(
            path = %file_path.display(),
            key = %path,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn delete(&self, path: &str) -> StorageResult<bool> {
        let file_path = self.key_to_path(path)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&file_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %file_path.display(),
                    key = %path,
                    "Local storage delete failed"
                );
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    file_path.display(),
                    e
                )));
            }
        }

        tracing::info!(
            path = %file_path.display(),
            key = %path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(true)
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let file_path = self.key_to_path(path)?;
        match fs::metadata(&file_path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(map_io_error(e, &file_path)),
        }
    }

    fn url(&self, path: &str) -> StorageResult<String> {
        validate_key(path)?;
        Ok(self.generate_url(path))
    }

    async fn get_metadata(&self, path: &str) -> StorageResult<ObjectMetadata> {
        let file_path = self.key_to_path(path)?;
        let meta = fs::metadata(&file_path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => map_io_error(e, &file_path),
        })?;

        if !meta.is_file() {
            return Err(StorageError::NotFound(path.to_string()));
        }

        Ok(self.to_metadata(path.to_string(), &meta))
    }

    async fn list_files(&self, prefix: &str) -> StorageResult<Vec<ObjectMetadata>> {
        let prefix = prefix.trim_start_matches('/');
        if !prefix.is_empty() {
            validate_key(prefix)?;
        }

        // Walk from the deepest directory the prefix names, then filter by full prefix.
        let start_dir = match prefix.rsplit_once('/') {
            Some((dir, _)) => self.base_path.join(dir),
            None => self.base_path.clone(),
        };

        let mut files = Vec::new();
        let mut pending = vec![start_dir];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(map_io_error(e, &dir)),
            };

            while let Some(entry) = entries.next_entry().await? {
                let meta = entry.metadata().await?;
                let entry_path = entry.path();
                if meta.is_dir() {
                    pending.push(entry_path);
                    continue;
                }

                let Ok(relative) = entry_path.strip_prefix(&self.base_path) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");

                if key.starts_with(prefix) {
                    files.push(self.to_metadata(key, &meta));
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    async fn signed_url(&self, path: &str, _expires_in: Duration) -> StorageResult<String> {
        validate_key(path)?;
        Err(StorageError::Unsupported(
            "Local disks cannot sign URLs".to_string(),
        ))
    }

    fn driver(&self) -> DriverKind {
        DriverKind::Local
    }
}
