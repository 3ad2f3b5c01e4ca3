use crate::error::TransformError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Output format for encoded images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
}

impl OutputFormat {
    /// Parse a format name; unknown names are reported back verbatim
    pub fn parse(s: &str) -> Result<Self, TransformError> {
        match s.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "avif" if cfg!(feature = "avif") => Ok(OutputFormat::Avif),
            _ => Err(TransformError::UnsupportedFormat(s.to_string())),
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Avif => "image/avif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
        }
    }

    /// Whether the encoder keeps an alpha channel
    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }

    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::WebP => Some(OutputFormat::WebP),
            ImageFormat::Avif => Some(OutputFormat::Avif),
            _ => None,
        }
    }

    /// Detect the format of already-encoded bytes
    pub fn detect(data: &[u8]) -> Option<Self> {
        image::guess_format(data)
            .ok()
            .and_then(Self::from_image_format)
    }
}

/// Format selection based on image properties
pub struct FormatSelector;

impl FormatSelector {
    /// Final output format for `img`
    ///
    /// A lossy-only target would drop transparency; such images are written as PNG.
    pub fn resolve(requested: OutputFormat, img: &DynamicImage) -> OutputFormat {
        if !requested.supports_alpha() && Self::has_meaningful_alpha(img) {
            tracing::debug!(
                requested = requested.name(),
                "Source has transparency, encoding as png instead"
            );
            return OutputFormat::Png;
        }
        requested
    }

    /// Check if image has a meaningful alpha channel (not fully opaque)
    pub fn has_meaningful_alpha(img: &DynamicImage) -> bool {
        if !img.color().has_alpha() {
            return false;
        }
        img.to_rgba8().pixels().any(|pixel| pixel[3] < 255)
    }
}

/// Largest side libwebp accepts
const WEBP_MAX_DIMENSION: u32 = 16383;

/// Encoder front-end
pub struct ImageCompressor;

impl ImageCompressor {
    /// Encode `img` as `format`. `quality` (1-100) applies to lossy formats.
    pub fn encode(
        img: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, TransformError> {
        let quality = quality.clamp(1, 100);
        match format {
            OutputFormat::Jpeg => Self::compress_jpeg(img, quality),
            OutputFormat::Png => Self::compress_png(img),
            OutputFormat::WebP => Self::compress_webp(img, quality),
            OutputFormat::Avif => Self::compress_avif(img, quality),
        }
    }

    fn compress_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
        let rgb_img = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb_img
            .write_with_encoder(encoder)
            .map_err(|e| TransformError::encode("jpeg", e))?;
        Ok(buffer)
    }

    fn compress_png(img: &DynamicImage) -> Result<Vec<u8>, TransformError> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| TransformError::encode("png", e))?;
        Ok(buffer)
    }

    fn compress_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 || width > WEBP_MAX_DIMENSION || height > WEBP_MAX_DIMENSION {
            return Err(TransformError::encode(
                "webp",
                format!(
                    "{}x{} is outside the WebP range of 1 to {} pixels per side",
                    width, height, WEBP_MAX_DIMENSION
                ),
            ));
        }

        let encoded = if img.color().has_alpha() {
            let rgba_img = img.to_rgba8();
            webp::Encoder::from_rgba(&rgba_img, width, height).encode_simple(false, quality as f32)
        } else {
            let rgb_img = img.to_rgb8();
            webp::Encoder::from_rgb(&rgb_img, width, height).encode_simple(false, quality as f32)
        };

        encoded
            .map(|memory| memory.to_vec())
            .map_err(|e| TransformError::encode("webp", format!("{:?}", e)))
    }

    #[cfg(feature = "avif")]
    fn compress_avif(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
        let (width, height) = img.dimensions();
        let encoder = ravif::Encoder::new()
            .with_quality(quality as f32)
            .with_speed(6); // Balance between speed and compression

        let encoded = if img.color().has_alpha() {
            let rgba_img = img.to_rgba8();
            let pixels: Vec<rgb::RGBA8> = rgba_img
                .as_raw()
                .chunks_exact(4)
                .map(|c| rgb::RGBA8::new(c[0], c[1], c[2], c[3]))
                .collect();
            encoder.encode_rgba(ravif::Img::new(
                pixels.as_slice(),
                width as usize,
                height as usize,
            ))
        } else {
            let rgb_img = img.to_rgb8();
            let pixels: Vec<rgb::RGB8> = rgb_img
                .as_raw()
                .chunks_exact(3)
                .map(|c| rgb::RGB8::new(c[0], c[1], c[2]))
                .collect();
            encoder.encode_rgb(ravif::Img::new(
                pixels.as_slice(),
                width as usize,
                height as usize,
            ))
        };

        encoded
            .map(|image| image.avif_file)
            .map_err(|e| TransformError::encode("avif", e))
    }

    #[cfg(not(feature = "avif"))]
    fn compress_avif(_img: &DynamicImage, _quality: u8) -> Result<Vec<u8>, TransformError> {
        Err(TransformError::UnsupportedFormat("avif".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn opaque() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([10, 120, 200])))
    }

    fn translucent() -> DynamicImage {
        let mut img = RgbaImage::from_pixel(16, 16, Rgba([10, 120, 200, 255]));
        img.put_pixel(3, 3, Rgba([0, 0, 0, 0]));
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("jpeg").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::parse("JPG").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::parse("png").unwrap(), OutputFormat::Png);
        assert_eq!(OutputFormat::parse("webp").unwrap(), OutputFormat::WebP);

        match OutputFormat::parse("tiff") {
            Err(TransformError::UnsupportedFormat(name)) => assert_eq!(name, "tiff"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_alpha_forces_lossless_fallback() {
        assert_eq!(
            FormatSelector::resolve(OutputFormat::Jpeg, &translucent()),
            OutputFormat::Png
        );
        assert_eq!(
            FormatSelector::resolve(OutputFormat::WebP, &translucent()),
            OutputFormat::WebP
        );
        assert_eq!(
            FormatSelector::resolve(OutputFormat::Jpeg, &opaque()),
            OutputFormat::Jpeg
        );

        // An alpha channel that is fully opaque carries no transparency
        let opaque_rgba = DynamicImage::ImageRgba8(opaque().to_rgba8());
        assert!(!FormatSelector::has_meaningful_alpha(&opaque_rgba));
    }

    #[test]
    fn test_encoded_bytes_match_format() {
        for format in [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::WebP] {
            let data = ImageCompressor::encode(&opaque(), format, 80).unwrap();
            assert_eq!(OutputFormat::detect(&data), Some(format));
        }
    }

    #[test]
    fn test_webp_rejects_oversized_image() {
        let wide = DynamicImage::ImageRgb8(RgbImage::new(WEBP_MAX_DIMENSION + 1, 2));
        match ImageCompressor::encode(&wide, OutputFormat::WebP, 80) {
            Err(TransformError::Encode { format, .. }) => assert_eq!(format, "webp"),
            other => panic!("unexpected: {:?}", other.map(|d| d.len())),
        }

        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(ImageCompressor::encode(&empty, OutputFormat::WebP, 80).is_err());
    }

    #[test]
    fn test_webp_keeps_alpha() {
        let data = ImageCompressor::encode(&translucent(), OutputFormat::WebP, 90).unwrap();
        let decoded = image::load_from_memory(&data).unwrap();
        assert!(decoded.color().has_alpha());
    }
}
