//! Extension and MIME type mapping.

/// (extension, canonical MIME type) pairs, first match wins for reverse lookups
const TABLE: &[(&str, &str)] = &[
    // Images
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("avif", "image/avif"),
    ("heic", "image/heic"),
    ("svg", "image/svg+xml"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("ico", "image/x-icon"),
    // Videos
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    // Audio
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("m4a", "audio/mp4"),
    // Documents
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("json", "application/json"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
];

pub const OCTET_STREAM: &str = "application/octet-stream";

/// MIME type for a file extension (without the dot), falling back to octet-stream
pub fn mime_for_extension(extension: &str) -> &'static str {
    let extension = extension.trim_start_matches('.').to_lowercase();
    TABLE
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .unwrap_or(OCTET_STREAM)
}

/// MIME type guessed from a path's extension
pub fn mime_for_path(path: &str) -> &'static str {
    extension_of(path)
        .map(|ext| mime_for_extension(&ext))
        .unwrap_or(OCTET_STREAM)
}

/// Preferred extension (without the dot) for a MIME type
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    let normalized = normalize_mime(mime_type);
    TABLE
        .iter()
        .find(|(_, mime)| *mime == normalized)
        .map(|(ext, _)| *ext)
}

/// Lower-cased extension of the last path component, if any
pub fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Strip parameters and lower-case, e.g. "image/JPEG; q=1" -> "image/jpeg"
pub fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or(mime_type)
        .trim()
        .to_lowercase()
}

pub fn is_image_mime(mime_type: &str) -> bool {
    normalize_mime(mime_type).starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_lookups() {
        assert_eq!(mime_for_extension("JPG"), "image/jpeg");
        assert_eq!(mime_for_extension(".png"), "image/png");
        assert_eq!(mime_for_extension("unknown"), OCTET_STREAM);
        assert_eq!(mime_for_path("uploads/a.webp"), "image/webp");
        assert_eq!(extension_for_mime("image/jpeg; charset=binary"), Some("jpg"));
        assert_eq!(extension_for_mime("application/x-nope"), None);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.JPG"), Some("jpg".to_string()));
        assert_eq!(extension_of("dir.d/archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(extension_of("dir.d/README"), None);
        assert_eq!(extension_of(".bashrc"), None);
    }
}
