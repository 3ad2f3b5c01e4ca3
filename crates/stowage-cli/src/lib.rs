use anyhow::Context;
use std::path::Path;
use stowage_core::{mime, ThumbnailSize, UploadedFile};
use stowage_services::{OutputFormat, RawInput, ThumbnailSpec};

/// Initialize tracing for the CLI binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Read a local file into an upload input, typed by its extension
pub async fn read_input(path: &Path) -> anyhow::Result<RawInput> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = mime::mime_for_path(&filename);

    Ok(UploadedFile::new(filename, content_type, data).into())
}

/// `suffix=WxH`, e.g. `thumb=200x200`
pub fn parse_thumbnail(s: &str) -> Result<ThumbnailSpec, String> {
    let (suffix, size) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid thumbnail '{}'. Expected: suffix=WxH", s))?;
    let suffix = suffix.trim();
    if suffix.is_empty() {
        return Err(format!("Missing thumbnail suffix in '{}'", s));
    }
    let size: ThumbnailSize = size.parse().map_err(|e: anyhow::Error| e.to_string())?;
    if size.width == 0 || size.height == 0 {
        return Err(format!("Thumbnail size must be positive, got {}", s));
    }
    Ok(ThumbnailSpec::new(suffix, size.width, size.height))
}

pub fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::parse(s).map_err(|e| e.to_string())
}
