//! Declarative upload validation
//!
//! Rules trust the declared MIME type and file name; byte-level checks live in
//! [`crate::security`]. Every rule is evaluated and all failures are returned together.

use crate::metadata::ImageMetadata;
use serde::{Deserialize, Serialize};
use stowage_core::{format_bytes, FileBlob, ValidationError, Violation};

/// Decoded-dimension bounds for image uploads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionBounds {
    pub min_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// Required width / height ratio
    pub aspect_ratio: Option<f64>,
    /// Allowed absolute deviation from `aspect_ratio`
    pub aspect_ratio_tolerance: f64,
}

impl Default for DimensionBounds {
    fn default() -> Self {
        Self {
            min_width: None,
            min_height: None,
            max_width: None,
            max_height: None,
            aspect_ratio: None,
            aspect_ratio_tolerance: 0.01,
        }
    }
}

impl DimensionBounds {
    pub fn max(width: u32, height: u32) -> Self {
        Self {
            max_width: Some(width),
            max_height: Some(height),
            ..Self::default()
        }
    }

    pub fn min(width: u32, height: u32) -> Self {
        Self {
            min_width: Some(width),
            min_height: Some(height),
            ..Self::default()
        }
    }

    pub fn with_aspect_ratio(mut self, ratio: f64, tolerance: f64) -> Self {
        self.aspect_ratio = Some(ratio);
        self.aspect_ratio_tolerance = tolerance;
        self
    }

    fn check(&self, width: u32, height: u32, violations: &mut Vec<Violation>) {
        if let Some(min) = self.min_width.filter(|min| width < *min) {
            violations.push(Violation::new(
                "dimensions",
                format!("Image width {}px is below the minimum of {}px", width, min),
            ));
        }
        if let Some(min) = self.min_height.filter(|min| height < *min) {
            violations.push(Violation::new(
                "dimensions",
                format!("Image height {}px is below the minimum of {}px", height, min),
            ));
        }
        if let Some(max) = self.max_width.filter(|max| width > *max) {
            violations.push(Violation::new(
                "dimensions",
                format!("Image width {}px exceeds the maximum of {}px", width, max),
            ));
        }
        if let Some(max) = self.max_height.filter(|max| height > *max) {
            violations.push(Violation::new(
                "dimensions",
                format!("Image height {}px exceeds the maximum of {}px", height, max),
            ));
        }

        if let Some(expected) = self.aspect_ratio {
            let actual = width as f64 / height.max(1) as f64;
            if (actual - expected).abs() > self.aspect_ratio_tolerance {
                violations.push(Violation::new(
                    "aspect_ratio",
                    format!(
                        "Aspect ratio {:.3} is not within {} of {:.3}",
                        actual, self.aspect_ratio_tolerance, expected
                    ),
                ));
            }
        }
    }
}

/// Per-call rule set. Empty lists mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    pub max_size: Option<usize>,
    pub min_size: Option<usize>,
    /// Exact MIME types or `type/*` wildcards
    pub allowed_types: Vec<String>,
    pub allowed_extensions: Vec<String>,
    pub blocked_extensions: Vec<String>,
    pub dimensions: Option<DimensionBounds>,
}

impl ValidationRules {
    /// Common web image formats
    pub fn images() -> Self {
        Self::default()
            .allow_types(["image/*"])
            .allow_extensions(["jpg", "jpeg", "png", "gif", "webp", "avif"])
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = Some(min_size);
        self
    }

    pub fn allow_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn block_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dimensions(mut self, bounds: DimensionBounds) -> Self {
        self.dimensions = Some(bounds);
        self
    }
}

/// Upload validator
pub struct FileValidator;

impl FileValidator {
    /// Check `blob` against every rule, returning all violations at once
    pub fn validate(blob: &FileBlob, rules: &ValidationRules) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        Self::check_size(blob.size(), rules, &mut violations);
        Self::check_mime_type(blob.declared_mime_type(), rules, &mut violations);
        Self::check_extension(blob.extension().as_deref(), rules, &mut violations);

        if let Some(bounds) = rules.dimensions.as_ref().filter(|_| blob.is_image()) {
            match ImageMetadata::dimensions(blob.data()) {
                Ok((width, height)) => bounds.check(width, height, &mut violations),
                Err(e) => violations.push(Violation::new(
                    "undecodable",
                    format!("Could not read image dimensions: {}", e),
                )),
            }
        }

        if violations.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            file = %blob.original_name(),
            violations = ?violations,
            "File failed validation"
        );
        Err(ValidationError::new(violations))
    }

    fn check_size(size: usize, rules: &ValidationRules, violations: &mut Vec<Violation>) {
        if let Some(max) = rules.max_size.filter(|max| size > *max) {
            violations.push(Violation::new(
                "max_size",
                format!(
                    "File size {} exceeds the maximum of {}",
                    format_bytes(size as u64),
                    format_bytes(max as u64)
                ),
            ));
        }
        if let Some(min) = rules.min_size.filter(|min| size < *min) {
            violations.push(Violation::new(
                "min_size",
                format!(
                    "File size {} is below the minimum of {}",
                    format_bytes(size as u64),
                    format_bytes(min as u64)
                ),
            ));
        }
    }

    fn check_mime_type(mime_type: &str, rules: &ValidationRules, violations: &mut Vec<Violation>) {
        if rules.allowed_types.is_empty() {
            return;
        }
        let allowed = rules
            .allowed_types
            .iter()
            .any(|pattern| mime_matches(pattern, mime_type));
        if !allowed {
            violations.push(Violation::new(
                "mime_type",
                format!(
                    "File type '{}' is not allowed (allowed: {})",
                    mime_type,
                    rules.allowed_types.join(", ")
                ),
            ));
        }
    }

    fn check_extension(
        extension: Option<&str>,
        rules: &ValidationRules,
        violations: &mut Vec<Violation>,
    ) {
        let extension = extension.unwrap_or_default();

        if !rules.allowed_extensions.is_empty()
            && !rules
                .allowed_extensions
                .iter()
                .any(|allowed| normalize_extension(allowed) == extension)
        {
            violations.push(Violation::new(
                "extension",
                format!(
                    "Extension '{}' is not allowed (allowed: {})",
                    extension,
                    rules.allowed_extensions.join(", ")
                ),
            ));
        }

        if !extension.is_empty()
            && rules
                .blocked_extensions
                .iter()
                .any(|blocked| normalize_extension(blocked) == extension)
        {
            violations.push(Violation::new(
                "blocked_extension",
                format!("Extension '{}' is blocked", extension),
            ));
        }
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

fn mime_matches(pattern: &str, mime_type: &str) -> bool {
    let pattern = pattern.trim().to_lowercase();
    match pattern.strip_suffix("/*") {
        Some(prefix) => mime_type
            .split_once('/')
            .is_some_and(|(kind, _)| kind == prefix),
        None => pattern == "*/*" || pattern == mime_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([0, 0, 0])));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_size_bounds() {
        let blob = FileBlob::new(vec![0u8; 10], "image/jpeg", "a.jpg");

        let err = FileValidator::validate(&blob, &ValidationRules::default().with_max_size(5)).unwrap_err();
        assert!(err.has_rule("max_size"));
        assert!(err.to_string().contains("10 B"));

        let err = FileValidator::validate(&blob, &ValidationRules::default().with_min_size(11)).unwrap_err();
        assert!(err.has_rule("min_size"));

        assert!(FileValidator::validate(&blob, &ValidationRules::default().with_max_size(10)).is_ok());
    }

    #[test]
    fn test_mime_wildcards() {
        let rules = ValidationRules::default().allow_types(["image/*", "application/pdf"]);

        let jpeg = FileBlob::new(vec![1], "image/jpeg", "a.jpg");
        let pdf = FileBlob::new(vec![1], "application/pdf", "a.pdf");
        let text = FileBlob::new(vec![1], "text/plain", "a.txt");

        assert!(FileValidator::validate(&jpeg, &rules).is_ok());
        assert!(FileValidator::validate(&pdf, &rules).is_ok());
        assert!(FileValidator::validate(&text, &rules).unwrap_err().has_rule("mime_type"));
    }

    #[test]
    fn test_extension_allow_and_block_lists() {
        let rules = ValidationRules::default()
            .allow_extensions([".JPG", "png"])
            .block_extensions(["exe"]);

        let ok = FileBlob::new(vec![1], "image/jpeg", "photo.jpg");
        assert!(FileValidator::validate(&ok, &rules).is_ok());

        let err = FileValidator::validate(&FileBlob::new(vec![1], "image/gif", "anim.gif"), &rules)
            .unwrap_err();
        assert!(err.has_rule("extension"));
        assert!(!err.has_rule("blocked_extension"));

        let err = FileValidator::validate(&FileBlob::new(vec![1], "application/x-msdownload", "run.exe"), &rules)
            .unwrap_err();
        assert!(err.has_rule("extension"));
        assert!(err.has_rule("blocked_extension"));
    }

    #[test]
    fn test_all_violations_reported_together() {
        let rules = ValidationRules::images().with_max_size(2);
        let blob = FileBlob::new(b"hello world".to_vec(), "text/plain", "notes.txt");

        let err = FileValidator::validate(&blob, &rules).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        assert!(err.has_rule("max_size"));
        assert!(err.has_rule("mime_type"));
        assert!(err.has_rule("extension"));
    }

    #[test]
    fn test_dimension_bounds() {
        let blob = FileBlob::new(png(300, 100), "image/png", "wide.png");

        let rules = ValidationRules::default().with_dimensions(DimensionBounds::max(200, 200));
        let err = FileValidator::validate(&blob, &rules).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert!(err.has_rule("dimensions"));

        let rules = ValidationRules::default().with_dimensions(DimensionBounds::min(100, 100));
        assert!(FileValidator::validate(&blob, &rules).is_ok());

        let rules = ValidationRules::default()
            .with_dimensions(DimensionBounds::default().with_aspect_ratio(3.0, 0.01));
        assert!(FileValidator::validate(&blob, &rules).is_ok());

        let rules = ValidationRules::default()
            .with_dimensions(DimensionBounds::default().with_aspect_ratio(16.0 / 9.0, 0.05));
        assert!(FileValidator::validate(&blob, &rules).unwrap_err().has_rule("aspect_ratio"));
    }

    #[test]
    fn test_dimension_bounds_on_undecodable_image() {
        let blob = FileBlob::new(b"not really a png".to_vec(), "image/png", "fake.png");
        let rules = ValidationRules::default().with_dimensions(DimensionBounds::max(10, 10));
        assert!(FileValidator::validate(&blob, &rules).unwrap_err().has_rule("undecodable"));

        // Non-image types skip dimension checks
        let blob = FileBlob::new(b"%PDF-1.4".to_vec(), "application/pdf", "doc.pdf");
        assert!(FileValidator::validate(&blob, &rules).is_ok());
    }
}
