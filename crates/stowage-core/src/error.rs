//! Error types module
//!
//! Validation and security rejections carry the complete list of violations found
//! for a file, so a caller can surface every problem at once. Both are raised before
//! any bytes are persisted.
//!
//! Every error in the workspace implements [`ErrorMetadata`] so outer layers (HTTP
//! handlers, the CLI) can decide how to present and log it without matching on
//! crate internals.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for rejections worth an operator's attention
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "VALIDATION_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether the caller can fix the input and try again
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Violation {
    /// Stable machine code of the rule, e.g. `max_size` or `executable`
    pub rule: &'static str,
    pub message: String,
}

impl Violation {
    pub fn new(rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {}", self.rule, self.message)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Declarative rule checks failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Validation failed: {}", join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Check whether a given rule is among the violations
    pub fn has_rule(&self, rule: &str) -> bool {
        self.violations.iter().any(|v| v.rule == rule)
    }
}

/// Content-based defenses rejected the file.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Security scan failed: {}", join_violations(.violations))]
pub struct SecurityError {
    pub violations: Vec<Violation>,
}

impl SecurityError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn has_rule(&self, rule: &str) -> bool {
        self.violations.iter().any(|v| v.rule == rule)
    }
}

/// Raw upload input could not be turned into a file blob.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InputError {
    #[error("Malformed data URI: {0}")]
    MalformedDataUri(String),

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("Empty upload")]
    Empty,
}

impl ErrorMetadata for ValidationError {
    fn error_code(&self) -> &'static str {
        "VALIDATION_FAILED"
    }

    fn is_recoverable(&self) -> bool {
        true
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

impl ErrorMetadata for SecurityError {
    fn error_code(&self) -> &'static str {
        "SECURITY_REJECTED"
    }

    fn is_recoverable(&self) -> bool {
        true
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Warn
    }
}

impl ErrorMetadata for InputError {
    fn error_code(&self) -> &'static str {
        "INVALID_INPUT"
    }

    fn is_recoverable(&self) -> bool {
        true
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}
