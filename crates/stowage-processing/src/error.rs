use stowage_core::{ErrorMetadata, LogLevel};

/// Image pipeline failures. Fatal for the file being processed only.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to encode {format} image: {message}")]
    Encode { format: String, message: String },

    #[error("Invalid watermark: {0}")]
    Watermark(String),

    #[error("Invalid transform options: {0}")]
    InvalidOptions(String),
}

impl TransformError {
    pub(crate) fn encode(format: impl Into<String>, message: impl ToString) -> Self {
        TransformError::Encode {
            format: format.into(),
            message: message.to_string(),
        }
    }
}

impl ErrorMetadata for TransformError {
    fn error_code(&self) -> &'static str {
        match self {
            TransformError::Decode(_) => "IMAGE_DECODE_FAILED",
            TransformError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            TransformError::Encode { .. } => "IMAGE_ENCODE_FAILED",
            TransformError::Watermark(_) => "INVALID_WATERMARK",
            TransformError::InvalidOptions(_) => "INVALID_TRANSFORM",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, TransformError::Encode { .. })
    }

    fn client_message(&self) -> String {
        match self {
            TransformError::Encode { format, .. } => format!("Failed to encode {} image", format),
            _ => self.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            TransformError::Encode { .. } => LogLevel::Error,
            _ => LogLevel::Debug,
        }
    }
}
