//! Image metadata extraction

use crate::error::TransformError;
use crate::image::orientation::ImageOrientation;
use image::{GenericImageView, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Image metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub size_bytes: u64,
    pub has_alpha: bool,
    /// Raw EXIF orientation, when present and not the identity (1)
    pub exif_orientation: Option<u8>,
}

impl ImageMetadata {
    /// Read metadata from an encoded image. Decodes the full image to report alpha.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TransformError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| TransformError::Decode(e.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| TransformError::Decode("Unrecognized image format".to_string()))?;
        let img = reader
            .decode()
            .map_err(|e| TransformError::Decode(e.to_string()))?;

        let (width, height) = img.dimensions();
        let orientation = ImageOrientation::read_exif_orientation(data);

        Ok(Self {
            width,
            height,
            format: format_name(format).to_string(),
            size_bytes: data.len() as u64,
            has_alpha: img.color().has_alpha(),
            exif_orientation: (orientation != 1).then_some(orientation),
        })
    }

    /// Read only the header dimensions, without decoding pixels
    pub fn dimensions(data: &[u8]) -> Result<(u32, u32), TransformError> {
        ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| TransformError::Decode(e.to_string()))?
            .into_dimensions()
            .map_err(|e| TransformError::Decode(e.to_string()))
    }
}

pub(crate) fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        ImageFormat::Avif => "avif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        ImageFormat::Ico => "ico",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png(width: u32, height: u32, alpha: u8) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, alpha]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_metadata_from_png() {
        let data = png(30, 20, 128);
        let meta = ImageMetadata::from_bytes(&data).unwrap();
        assert_eq!((meta.width, meta.height), (30, 20));
        assert_eq!(meta.format, "png");
        assert!(meta.has_alpha);
        assert_eq!(meta.exif_orientation, None);
        assert_eq!(meta.size_bytes, data.len() as u64);
    }

    #[test]
    fn test_dimensions_without_decoding() {
        assert_eq!(ImageMetadata::dimensions(&png(7, 3, 255)).unwrap(), (7, 3));
    }

    #[test]
    fn test_metadata_invalid_image() {
        assert!(matches!(
            ImageMetadata::from_bytes(b"not an image"),
            Err(TransformError::Decode(_))
        ));
    }
}
