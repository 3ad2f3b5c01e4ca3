//! Upload input parsing.
//!
//! A [`FileBlob`] is built once per call from one of the accepted [`RawInput`] shapes
//! and is immutable afterwards.

use base64::Engine;

use crate::error::InputError;
use crate::mime::{extension_for_mime, extension_of, mime_for_extension, normalize_mime, OCTET_STREAM};

const DEFAULT_STEM: &str = "upload";

/// A file already split into its parts, e.g. by a multipart extractor
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }
}

/// Accepted upload input shapes
#[derive(Debug, Clone)]
pub enum RawInput {
    /// Raw bytes with optional declared name and type
    Bytes {
        data: Vec<u8>,
        filename: Option<String>,
        mime_type: Option<String>,
    },
    /// `data:<mime>;base64,<payload>`
    DataUri {
        uri: String,
        filename: Option<String>,
    },
    /// Pre-parsed file object
    File(UploadedFile),
}

impl RawInput {
    pub fn bytes(data: Vec<u8>) -> Self {
        RawInput::Bytes {
            data,
            filename: None,
            mime_type: None,
        }
    }

    pub fn named_bytes(data: Vec<u8>, filename: impl Into<String>, mime_type: impl Into<String>) -> Self {
        RawInput::Bytes {
            data,
            filename: Some(filename.into()),
            mime_type: Some(mime_type.into()),
        }
    }

    pub fn data_uri(uri: impl Into<String>) -> Self {
        RawInput::DataUri {
            uri: uri.into(),
            filename: None,
        }
    }
}

impl From<UploadedFile> for RawInput {
    fn from(file: UploadedFile) -> Self {
        RawInput::File(file)
    }
}

/// Uploaded bytes plus declared metadata, prior to validation
#[derive(Debug, Clone)]
pub struct FileBlob {
    data: Vec<u8>,
    declared_mime_type: String,
    original_name: String,
}

impl FileBlob {
    pub fn new(data: Vec<u8>, declared_mime_type: impl Into<String>, original_name: impl Into<String>) -> Self {
        Self {
            data,
            declared_mime_type: normalize_mime(&declared_mime_type.into()),
            original_name: original_name.into(),
        }
    }

    /// Parse raw input into a blob. Missing names and types are filled from each other.
    pub fn from_input(input: RawInput) -> Result<Self, InputError> {
        let blob = match input {
            RawInput::Bytes {
                data,
                filename,
                mime_type,
            } => Self::from_parts(data, filename, mime_type),
            RawInput::DataUri { uri, filename } => {
                let (mime_type, data) = decode_data_uri(&uri)?;
                Self::from_parts(data, filename, Some(mime_type))
            }
            RawInput::File(file) => Self::from_parts(
                file.data,
                Some(file.filename),
                Some(file.content_type),
            ),
        };

        if blob.data.is_empty() {
            return Err(InputError::Empty);
        }
        Ok(blob)
    }

    fn from_parts(data: Vec<u8>, filename: Option<String>, mime_type: Option<String>) -> Self {
        let filename = filename.filter(|name| !name.trim().is_empty());
        let mime_type = mime_type
            .map(|m| normalize_mime(&m))
            .filter(|m| !m.is_empty())
            .or_else(|| {
                filename
                    .as_deref()
                    .and_then(extension_of)
                    .map(|ext| mime_for_extension(&ext).to_string())
            })
            .unwrap_or_else(|| OCTET_STREAM.to_string());

        let original_name = filename.unwrap_or_else(|| match extension_for_mime(&mime_type) {
            Some(ext) => format!("{}.{}", DEFAULT_STEM, ext),
            None => DEFAULT_STEM.to_string(),
        });

        Self {
            data,
            declared_mime_type: mime_type,
            original_name,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn declared_mime_type(&self) -> &str {
        &self.declared_mime_type
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Lower-cased extension of the original name, without the dot
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.original_name)
    }

    pub fn is_image(&self) -> bool {
        crate::mime::is_image_mime(&self.declared_mime_type)
    }
}

fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), InputError> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| InputError::MalformedDataUri("missing 'data:' prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| InputError::MalformedDataUri("missing ',' separator".to_string()))?;

    let mut params = header.split(';');
    let mime_type = params.next().unwrap_or_default().trim().to_string();
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(InputError::MalformedDataUri(
            "only base64-encoded data URIs are accepted".to_string(),
        ));
    }

    let data = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| InputError::InvalidBase64(e.to_string()))?;

    let mime_type = if mime_type.is_empty() {
        OCTET_STREAM.to_string()
    } else {
        mime_type
    };
    Ok((mime_type, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_input_infers_type_from_name() {
        let blob = FileBlob::from_input(RawInput::Bytes {
            data: vec![1, 2, 3],
            filename: Some("photo.JPG".to_string()),
            mime_type: None,
        })
        .unwrap();

        assert_eq!(blob.declared_mime_type(), "image/jpeg");
        assert_eq!(blob.original_name(), "photo.JPG");
        assert_eq!(blob.extension().as_deref(), Some("jpg"));
        assert_eq!(blob.size(), 3);
        assert!(blob.is_image());
    }

    #[test]
    fn test_bytes_input_without_metadata() {
        let blob = FileBlob::from_input(RawInput::bytes(vec![0xAB; 4])).unwrap();
        assert_eq!(blob.declared_mime_type(), OCTET_STREAM);
        assert_eq!(blob.original_name(), "upload");
    }

    #[test]
    fn test_data_uri_input() {
        let blob = FileBlob::from_input(RawInput::data_uri("data:image/png;base64,aGVsbG8=")).unwrap();
        assert_eq!(blob.data(), b"hello");
        assert_eq!(blob.declared_mime_type(), "image/png");
        assert_eq!(blob.original_name(), "upload.png");
    }

    #[test]
    fn test_data_uri_rejects_non_base64() {
        let result = FileBlob::from_input(RawInput::data_uri("data:text/plain,hello"));
        assert!(matches!(result, Err(InputError::MalformedDataUri(_))));

        let result = FileBlob::from_input(RawInput::data_uri("image/png;base64,aGVsbG8="));
        assert!(matches!(result, Err(InputError::MalformedDataUri(_))));

        let result = FileBlob::from_input(RawInput::data_uri("data:image/png;base64,!!!"));
        assert!(matches!(result, Err(InputError::InvalidBase64(_))));
    }

    #[test]
    fn test_file_input_normalizes_mime() {
        let file = UploadedFile::new("doc.pdf", "Application/PDF; charset=binary", b"%PDF-1.7".to_vec());
        let blob = FileBlob::from_input(file.into()).unwrap();
        assert_eq!(blob.declared_mime_type(), "application/pdf");
    }

    #[test]
    fn test_empty_input_rejected() {
        let result = FileBlob::from_input(RawInput::bytes(Vec::new()));
        assert!(matches!(result, Err(InputError::Empty)));
    }
}
