//! Shared key handling for storage backends.

use crate::{StorageError, StorageResult};

/// Reject keys that are empty, absolute, or contain parent-directory segments.
pub fn validate_key(key: &str) -> StorageResult<&str> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }

    if key.starts_with('/') || key.starts_with('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key must be relative: {}",
            key
        )));
    }

    if key.split(['/', '\\']).any(|segment| segment == "..") || key.contains('\0') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }

    Ok(key)
}

/// Join a directory prefix and a file name with exactly one `/`.
pub fn join(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Insert `_{suffix}` before the extension and switch the extension to `ext`.
///
/// `uploads/a.jpg` with suffix `thumb` and extension `webp` becomes
/// `uploads/a_thumb.webp`.
pub fn with_suffix(path: &str, suffix: &str, ext: &str) -> String {
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, path),
    };

    let stem = match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    };

    let name = format!("{}_{}.{}", stem, suffix, ext);
    match dir {
        Some(dir) => format!("{}/{}", dir, name),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("uploads/photo.jpg").is_ok());
        assert!(validate_key("a..b/photo.jpg").is_ok());
        assert!(matches!(validate_key(""), Err(StorageError::InvalidKey(_))));
        assert!(matches!(validate_key("/etc/passwd"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(validate_key("../secret"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(validate_key("a/../../b"), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn test_join() {
        assert_eq!(join("uploads/", "a.jpg"), "uploads/a.jpg");
        assert_eq!(join("", "a.jpg"), "a.jpg");
        assert_eq!(join("/uploads", "/a.jpg"), "uploads/a.jpg");
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix("uploads/a.jpg", "thumb", "jpg"), "uploads/a_thumb.jpg");
        assert_eq!(with_suffix("a.png", "small", "webp"), "a_small.webp");
        assert_eq!(with_suffix("dir.v2/noext", "thumb", "png"), "dir.v2/noext_thumb.png");
        assert_eq!(with_suffix(".hidden", "thumb", "jpg"), ".hidden_thumb.jpg");
    }
}
