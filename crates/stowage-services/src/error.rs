use stowage_core::{ErrorMetadata, InputError, LogLevel, SecurityError, ValidationError};
use stowage_processing::TransformError;
use stowage_storage::StorageError;

/// Any failure of a pipeline entry point
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Requested thumbnail dimensions are out of bounds or not allowed
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A blocking processing task panicked or was cancelled
    #[error("Processing task failed: {0}")]
    Task(String),
}

impl PipelineError {
    fn inner(&self) -> Option<&dyn ErrorMetadata> {
        match self {
            PipelineError::Input(e) => Some(e),
            PipelineError::Validation(e) => Some(e),
            PipelineError::Security(e) => Some(e),
            PipelineError::Transform(e) => Some(e),
            PipelineError::Storage(e) => Some(e),
            _ => None,
        }
    }

    /// True for a missing object, as opposed to a failing backend
    pub fn is_not_found(&self) -> bool {
        matches!(self, PipelineError::Storage(StorageError::NotFound(_)))
    }
}

impl ErrorMetadata for PipelineError {
    fn error_code(&self) -> &'static str {
        match self {
            PipelineError::InvalidDimensions(_) => "INVALID_DIMENSIONS",
            PipelineError::Config(_) => "CONFIG_ERROR",
            PipelineError::Task(_) => "INTERNAL_ERROR",
            _ => self.inner().map_or("INTERNAL_ERROR", |e| e.error_code()),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            PipelineError::InvalidDimensions(_) => true,
            PipelineError::Config(_) | PipelineError::Task(_) => false,
            _ => self.inner().is_some_and(|e| e.is_recoverable()),
        }
    }

    fn client_message(&self) -> String {
        match self {
            PipelineError::InvalidDimensions(_) => self.to_string(),
            PipelineError::Config(_) | PipelineError::Task(_) => {
                "An internal error occurred".to_string()
            }
            _ => self
                .inner()
                .map_or_else(|| self.to_string(), |e| e.client_message()),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            PipelineError::InvalidDimensions(_) => LogLevel::Debug,
            PipelineError::Config(_) | PipelineError::Task(_) => LogLevel::Error,
            _ => self.inner().map_or(LogLevel::Error, |e| e.log_level()),
        }
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(e: tokio::task::JoinError) -> Self {
        PipelineError::Task(e.to_string())
    }
}
