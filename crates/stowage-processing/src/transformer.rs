//! Image transformer - orchestrates all image transformations
//!
//! Operations always run in the same order: EXIF auto-orientation, resize,
//! watermark, filters, then encoding. Thumbnails are derived from the
//! decoded original rather than from the main output.

use crate::compression::{FormatSelector, ImageCompressor, OutputFormat};
use crate::error::TransformError;
use crate::image::filters::{FilterConfig, ImageFilters};
use crate::image::orientation::ImageOrientation;
use crate::image::resize::{ImageResize, ResizeOptions};
use crate::image::watermark::{Watermark, WatermarkConfig};
use crate::metadata::ImageMetadata;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;
use stowage_core::{Anchor, FitMode};

pub const DEFAULT_QUALITY: u8 = 80;

/// A thumbnail derived alongside the main image
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailSpec {
    /// Inserted before the extension of the stored path (`a.jpg` -> `a_{suffix}.jpg`)
    pub suffix: String,
    pub width: u32,
    pub height: u32,
    pub fit: FitMode,
    pub position: Anchor,
    /// Defaults to the main output format
    pub format: Option<OutputFormat>,
}

impl ThumbnailSpec {
    pub fn new(suffix: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            suffix: suffix.into(),
            width,
            height,
            fit: FitMode::Cover,
            position: Anchor::Center,
            format: None,
        }
    }

    pub fn with_fit(mut self, fit: FitMode, position: Anchor) -> Self {
        self.fit = fit;
        self.position = position;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub resize: Option<ResizeOptions>,
    pub watermark: Option<WatermarkConfig>,
    pub filters: FilterConfig,
    /// Output format; `None` keeps the source format where it can be encoded
    pub format: Option<OutputFormat>,
    pub quality: u8,
    pub thumbnails: Vec<ThumbnailSpec>,
    pub auto_orient: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            resize: None,
            watermark: None,
            filters: FilterConfig::default(),
            format: None,
            quality: DEFAULT_QUALITY,
            thumbnails: Vec::new(),
            auto_orient: true,
        }
    }
}

/// Encoded output of one pass
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub main: EncodedImage,
    /// `(suffix, image)` for each thumbnail that could be derived
    pub thumbnails: Vec<(String, EncodedImage)>,
    /// Describes the main output
    pub metadata: ImageMetadata,
}

/// Main image transformer that orchestrates all transform operations
pub struct ImageTransformer;

impl ImageTransformer {
    /// Run the full pipeline over an encoded image
    ///
    /// A thumbnail that fails to encode is logged and left out; the main
    /// image is still returned.
    pub fn process(data: &[u8], options: &TransformOptions) -> Result<ProcessedImage, TransformError> {
        Self::check_options(options)?;
        let (decoded, source_format) = Self::decode(data)?;

        let orientation = ImageOrientation::read_exif_orientation(data);
        let original = if options.auto_orient {
            ImageOrientation::apply_orientation(decoded, orientation)
        } else {
            decoded
        };

        let mut img = match options.resize {
            Some(ref resize) => ImageResize::apply(&original, resize),
            None => original.clone(),
        };

        if let Some(ref watermark) = options.watermark {
            tracing::debug!(
                position = ?watermark.position,
                opacity = watermark.opacity,
                "Applying watermark"
            );
            img = Watermark::apply(img, watermark, ImageResize::select_filter)?;
        }

        if !options.filters.is_empty() {
            tracing::debug!(filters = ?options.filters, "Applying image filters");
            img = ImageFilters::apply(img, &options.filters);
        }

        let requested = options
            .format
            .unwrap_or_else(|| Self::default_output_format(source_format));
        let main = Self::encode(&img, requested, options.quality)?;

        let mut thumbnails = Vec::with_capacity(options.thumbnails.len());
        for spec in &options.thumbnails {
            let resize = ResizeOptions::exact(spec.width, spec.height, spec.fit, spec.position);
            let thumb = ImageResize::apply(&original, &resize);
            let format = spec.format.unwrap_or(requested);

            match Self::encode(&thumb, format, options.quality) {
                Ok(encoded) => thumbnails.push((spec.suffix.clone(), encoded)),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        suffix = %spec.suffix,
                        width = spec.width,
                        height = spec.height,
                        "Failed to derive thumbnail"
                    );
                }
            }
        }

        let metadata = ImageMetadata {
            width: main.width,
            height: main.height,
            format: main.format.name().to_string(),
            size_bytes: main.data.len() as u64,
            has_alpha: main.format.supports_alpha() && img.color().has_alpha(),
            exif_orientation: (orientation != 1).then_some(orientation),
        };

        tracing::debug!(
            source_format = crate::metadata::format_name(source_format),
            output_format = main.format.name(),
            width = main.width,
            height = main.height,
            thumbnails = thumbnails.len(),
            "Image processed"
        );

        Ok(ProcessedImage {
            main,
            thumbnails,
            metadata,
        })
    }

    /// Derive a single thumbnail, keeping the source format
    pub fn thumbnail(
        data: &[u8],
        width: u32,
        height: u32,
        fit: FitMode,
        position: Anchor,
        quality: u8,
    ) -> Result<EncodedImage, TransformError> {
        if width == 0 || height == 0 {
            return Err(TransformError::InvalidOptions(format!(
                "thumbnail dimensions must be positive, got {}x{}",
                width, height
            )));
        }

        let (decoded, source_format) = Self::decode(data)?;
        let img = ImageOrientation::apply_exif_orientation(decoded, data);
        let resized = ImageResize::apply(&img, &ResizeOptions::exact(width, height, fit, position));

        Self::encode(&resized, Self::default_output_format(source_format), quality)
    }

    /// Requested sides must be positive
    fn check_options(options: &TransformOptions) -> Result<(), TransformError> {
        if let Some(resize) = &options.resize {
            if resize.width == Some(0) || resize.height == Some(0) {
                return Err(TransformError::InvalidOptions(format!(
                    "resize dimensions must be positive, got {:?}x{:?}",
                    resize.width, resize.height
                )));
            }
        }

        if let Some(spec) = options
            .thumbnails
            .iter()
            .find(|spec| spec.width == 0 || spec.height == 0)
        {
            return Err(TransformError::InvalidOptions(format!(
                "thumbnail '{}' dimensions must be positive, got {}x{}",
                spec.suffix, spec.width, spec.height
            )));
        }

        Ok(())
    }

    fn decode(data: &[u8]) -> Result<(DynamicImage, ImageFormat), TransformError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| TransformError::Decode(e.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| TransformError::Decode("Unrecognized image format".to_string()))?;
        let img = reader
            .decode()
            .map_err(|e| TransformError::Decode(e.to_string()))?;
        Ok((img, format))
    }

    fn encode(
        img: &DynamicImage,
        requested: OutputFormat,
        quality: u8,
    ) -> Result<EncodedImage, TransformError> {
        let format = FormatSelector::resolve(requested, img);
        let data = ImageCompressor::encode(img, format, quality)?;
        let (width, height) = img.dimensions();
        Ok(EncodedImage {
            data,
            format,
            width,
            height,
        })
    }

    /// Source formats we cannot write back (gif, bmp, ...) are re-encoded as PNG
    fn default_output_format(source: ImageFormat) -> OutputFormat {
        match OutputFormat::from_image_format(source) {
            Some(OutputFormat::Avif) if !cfg!(feature = "avif") => OutputFormat::Png,
            Some(format) => format,
            None => OutputFormat::Png,
        }
    }
}
