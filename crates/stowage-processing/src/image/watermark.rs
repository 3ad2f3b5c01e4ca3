use crate::error::TransformError;
use image::{imageops, DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;
use stowage_core::Anchor;

/// Watermark configuration
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    /// Encoded watermark image (PNG with transparency works best)
    pub image: Vec<u8>,
    pub position: Anchor,
    /// 0.0 (invisible) to 1.0 (opaque)
    pub opacity: f32,
    /// Distance kept from the edges, in pixels
    pub padding: u32,
    /// Watermark width as a percentage of the image width; `None` keeps its size
    pub relative_width: Option<f32>,
}

impl WatermarkConfig {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            image,
            position: Anchor::SouthEast,
            opacity: 1.0,
            padding: 0,
            relative_width: None,
        }
    }
}

pub struct Watermark;

impl Watermark {
    /// Apply watermark to image
    pub fn apply(
        img: DynamicImage,
        config: &WatermarkConfig,
        select_filter: fn(u32, u32, u32, u32) -> imageops::FilterType,
    ) -> Result<DynamicImage, TransformError> {
        if !(0.0..=1.0).contains(&config.opacity) {
            return Err(TransformError::Watermark(format!(
                "opacity must be between 0 and 1, got {}",
                config.opacity
            )));
        }

        let reader = ImageReader::new(Cursor::new(&config.image))
            .with_guessed_format()
            .map_err(|e| TransformError::Watermark(e.to_string()))?;
        let mut watermark_img = reader
            .decode()
            .map_err(|e| TransformError::Watermark(e.to_string()))?
            .to_rgba8();

        let (img_width, img_height) = img.dimensions();
        let (wm_width, wm_height) = watermark_img.dimensions();

        // Fit within the padded area, keeping the watermark's aspect ratio
        let available_width = img_width.saturating_sub(config.padding * 2).max(1);
        let available_height = img_height.saturating_sub(config.padding * 2).max(1);
        let wanted_width = match config.relative_width {
            Some(percent) => (img_width as f32 * percent / 100.0).round().max(1.0) as u32,
            None => wm_width,
        };
        let scale = (wanted_width as f32 / wm_width as f32)
            .min(available_width as f32 / wm_width as f32)
            .min(available_height as f32 / wm_height as f32);
        let target_width = ((wm_width as f32 * scale).round() as u32).max(1);
        let target_height = ((wm_height as f32 * scale).round() as u32).max(1);

        if wm_width != target_width || wm_height != target_height {
            let filter = select_filter(wm_width, wm_height, target_width, target_height);
            watermark_img = imageops::resize(&watermark_img, target_width, target_height, filter);
        }

        if config.opacity < 1.0 {
            for pixel in watermark_img.pixels_mut() {
                pixel[3] = (pixel[3] as f32 * config.opacity).round() as u8;
            }
        }

        let (fx, fy) = config.position.weights();
        let x = config.padding as i64
            + (available_width.saturating_sub(target_width) as f32 * fx).round() as i64;
        let y = config.padding as i64
            + (available_height.saturating_sub(target_height) as f32 * fy).round() as i64;

        let had_alpha = img.color().has_alpha();
        let mut img_rgba = img.to_rgba8();
        imageops::overlay(&mut img_rgba, &watermark_img, x, y);

        let result = DynamicImage::ImageRgba8(img_rgba);
        Ok(if had_alpha {
            result
        } else {
            DynamicImage::ImageRgb8(result.to_rgb8())
        })
    }
}
