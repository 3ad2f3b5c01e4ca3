//! Content-based upload defenses
//!
//! Where [`crate::validator`] trusts the declared type, the scanner looks at the
//! actual bytes. Checks run in a fixed order and every failure is collected:
//!
//! 1. signature vs. extension
//! 2. dangerous extensions
//! 3. embedded script markers and executable headers
//! 4. absolute size ceiling
//! 5. optional external virus scanner

pub mod heuristics;
pub mod signatures;

use async_trait::async_trait;
use std::sync::Arc;
use stowage_core::{FileBlob, SecurityError, Violation};

/// Result of an external virus scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    Clean,
    Infected { threat: String },
    /// The scanner could not give an answer (unreachable, timed out, ...)
    Error { message: String },
}

/// External malware scanner, e.g. a ClamAV daemon
#[async_trait]
pub trait VirusScanner: Send + Sync {
    async fn scan(&self, data: &[u8]) -> ScanResult;

    fn name(&self) -> &str;

    async fn is_available(&self) -> bool;
}

pub struct SecurityScanner {
    max_size_bytes: usize,
    virus_scanner: Option<Arc<dyn VirusScanner>>,
}

impl SecurityScanner {
    pub fn new(max_size_bytes: usize) -> Self {
        Self {
            max_size_bytes,
            virus_scanner: None,
        }
    }

    pub fn with_virus_scanner(mut self, scanner: Arc<dyn VirusScanner>) -> Self {
        self.virus_scanner = Some(scanner);
        self
    }

    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    /// Run every check; rejections are logged at warn level
    pub async fn scan(&self, blob: &FileBlob) -> Result<(), SecurityError> {
        let mut violations = self.inspect(blob);

        if let Some(scanner) = &self.virus_scanner {
            if blob.size() > self.max_size_bytes {
                tracing::debug!(
                    scanner = scanner.name(),
                    size_bytes = blob.size(),
                    "Skipping external scan of oversized file"
                );
            } else {
                match scanner.scan(blob.data()).await {
                    ScanResult::Clean => {}
                    ScanResult::Infected { threat } => violations.push(Violation::new(
                        "malware",
                        format!("{} detected {}", scanner.name(), threat),
                    )),
                    ScanResult::Error { message } => {
                        tracing::warn!(
                            scanner = scanner.name(),
                            error = %message,
                            file = %blob.original_name(),
                            "Virus scanner unavailable, continuing without it"
                        );
                    }
                }
            }
        }

        if violations.is_empty() {
            return Ok(());
        }

        tracing::warn!(
            file = %blob.original_name(),
            declared_type = %blob.declared_mime_type(),
            size_bytes = blob.size(),
            violations = ?violations,
            "Upload rejected by security scan"
        );
        Err(SecurityError::new(violations))
    }

    /// Local checks only (everything but the external scanner)
    pub fn inspect(&self, blob: &FileBlob) -> Vec<Violation> {
        let mut violations = Vec::new();
        let data = blob.data();

        if let Some(extension) = blob.extension() {
            if let (Some(expected), Some(detected)) = (
                signatures::expected_for_extension(&extension),
                signatures::detect(data),
            ) {
                if !expected.contains(&detected) {
                    violations.push(Violation::new(
                        "signature_mismatch",
                        format!(
                            "Content looks like {} but the file is named .{}",
                            detected.name(),
                            extension
                        ),
                    ));
                }
            }
        }

        if let Some(extension) = heuristics::dangerous_extension(blob.original_name()) {
            violations.push(Violation::new(
                "dangerous_extension",
                format!("Files with extension .{} are not accepted", extension),
            ));
        }

        let scripts = heuristics::embedded_scripts(data);
        if !scripts.is_empty() {
            violations.push(Violation::new(
                "embedded_script",
                format!("Embedded script content found: {}", scripts.join(", ")),
            ));
        }

        if let Some(kind) = heuristics::executable_header(data) {
            violations.push(Violation::new(
                "executable",
                format!("File starts with a {} executable header", kind),
            ));
        }

        if blob.size() > self.max_size_bytes {
            violations.push(Violation::new(
                "size_limit",
                format!(
                    "File size {} exceeds the absolute limit of {}",
                    stowage_core::format_bytes(blob.size() as u64),
                    stowage_core::format_bytes(self.max_size_bytes as u64)
                ),
            ));
        }

        violations
    }
}
