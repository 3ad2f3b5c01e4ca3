use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use stowage_core::{Anchor, FitMode};

/// Target box for a resize; one side may be left open to keep the aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResizeOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default)]
    pub fit: FitMode,
    #[serde(default)]
    pub position: Anchor,
}

impl ResizeOptions {
    pub fn exact(width: u32, height: u32, fit: FitMode, position: Anchor) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            fit,
            position,
        }
    }
}

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Fill in an open side from the source aspect ratio
    pub fn calculate_dimensions(
        orig_width: u32,
        orig_height: u32,
        width: Option<u32>,
        height: Option<u32>,
    ) -> (u32, u32) {
        match (width, height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => {
                let aspect_ratio = orig_height as f32 / orig_width as f32;
                let h = (w as f32 * aspect_ratio).round() as u32;
                (w, h.max(1))
            }
            (None, Some(h)) => {
                let aspect_ratio = orig_width as f32 / orig_height as f32;
                let w = (h as f32 * aspect_ratio).round() as u32;
                (w.max(1), h)
            }
            (None, None) => (orig_width, orig_height),
        }
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> imageops::FilterType {
        let width_ratio = orig_width as f32 / new_width.max(1) as f32;
        let height_ratio = orig_height as f32 / new_height.max(1) as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            imageops::FilterType::Triangle
        } else if max_ratio > 1.5 {
            imageops::FilterType::CatmullRom
        } else {
            imageops::FilterType::Lanczos3
        }
    }

    /// Resize image to exact dimensions
    pub fn resize_exact(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        if (orig_width, orig_height) == (width, height) {
            return img.clone();
        }
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }

    /// Resize according to the fit mode
    ///
    /// - `Cover`: fill the box, cropping overflow at the anchor
    /// - `Contain`: fit inside the box, padding the rest at the anchor
    /// - `Fill`: stretch to the box, ignoring aspect ratio
    /// - `Inside`: fit inside the box without enlarging, no padding (output may be smaller)
    /// - `Outside`: cover the box, no cropping (output may be larger)
    pub fn apply(img: &DynamicImage, options: &ResizeOptions) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (target_width, target_height) =
            Self::calculate_dimensions(orig_width, orig_height, options.width, options.height);

        // With one side open every fit mode reduces to a proportional resize.
        if options.width.is_none() || options.height.is_none() {
            if options.fit == FitMode::Inside
                && (target_width > orig_width || target_height > orig_height)
            {
                return img.clone();
            }
            return Self::resize_exact(img, target_width, target_height);
        }

        let scale_w = target_width as f64 / orig_width as f64;
        let scale_h = target_height as f64 / orig_height as f64;

        match options.fit {
            FitMode::Fill => Self::resize_exact(img, target_width, target_height),
            FitMode::Cover => {
                let (w, h) = scaled(orig_width, orig_height, scale_w.max(scale_h));
                let resized = Self::resize_exact(img, w.max(target_width), h.max(target_height));
                Self::crop_at(&resized, target_width, target_height, options.position)
            }
            FitMode::Outside => {
                let (w, h) = scaled(orig_width, orig_height, scale_w.max(scale_h));
                Self::resize_exact(img, w.max(target_width), h.max(target_height))
            }
            FitMode::Inside => {
                let (w, h) = scaled(orig_width, orig_height, scale_w.min(scale_h).min(1.0));
                Self::resize_exact(img, w.min(target_width), h.min(target_height))
            }
            FitMode::Contain => {
                let (w, h) = scaled(orig_width, orig_height, scale_w.min(scale_h));
                let resized = Self::resize_exact(img, w.min(target_width), h.min(target_height));
                Self::pad_at(&resized, target_width, target_height, options.position)
            }
        }
    }

    /// Crop a `width`x`height` window positioned by the anchor
    pub fn crop_at(img: &DynamicImage, width: u32, height: u32, anchor: Anchor) -> DynamicImage {
        let (img_width, img_height) = img.dimensions();
        let width = width.min(img_width);
        let height = height.min(img_height);
        let (fx, fy) = anchor.weights();

        let x = ((img_width - width) as f32 * fx).round() as u32;
        let y = ((img_height - height) as f32 * fy).round() as u32;
        img.crop_imm(x, y, width, height)
    }

    /// Place the image on a `width`x`height` canvas positioned by the anchor
    ///
    /// The background is transparent for sources with alpha, white otherwise.
    pub fn pad_at(img: &DynamicImage, width: u32, height: u32, anchor: Anchor) -> DynamicImage {
        let (img_width, img_height) = img.dimensions();
        if (img_width, img_height) == (width, height) {
            return img.clone();
        }

        let background = if img.color().has_alpha() {
            Rgba([0u8, 0, 0, 0])
        } else {
            Rgba([255u8, 255, 255, 255])
        };
        let mut canvas = RgbaImage::from_pixel(width, height, background);

        let (fx, fy) = anchor.weights();
        let x = (width.saturating_sub(img_width) as f32 * fx).round() as i64;
        let y = (height.saturating_sub(img_height) as f32 * fy).round() as i64;
        imageops::overlay(&mut canvas, &img.to_rgba8(), x, y);

        if img.color().has_alpha() {
            DynamicImage::ImageRgba8(canvas)
        } else {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
        }
    }
}

fn scaled(width: u32, height: u32, scale: f64) -> (u32, u32) {
    (
        ((width as f64 * scale).round() as u32).max(1),
        ((height as f64 * scale).round() as u32).max(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 0, 0])))
    }

    fn fit(img: &DynamicImage, w: u32, h: u32, fit: FitMode) -> (u32, u32) {
        ImageResize::apply(img, &ResizeOptions::exact(w, h, fit, Anchor::Center)).dimensions()
    }

    #[test]
    fn test_calculate_dimensions_width_only() {
        assert_eq!(ImageResize::calculate_dimensions(100, 50, Some(200), None), (200, 100));
        assert_eq!(ImageResize::calculate_dimensions(100, 50, None, Some(100)), (200, 100));
        assert_eq!(ImageResize::calculate_dimensions(100, 50, None, None), (100, 50));
    }

    #[test]
    fn test_fit_modes() {
        let img = image(400, 200);

        assert_eq!(fit(&img, 100, 100, FitMode::Cover), (100, 100));
        assert_eq!(fit(&img, 100, 100, FitMode::Contain), (100, 100));
        assert_eq!(fit(&img, 100, 100, FitMode::Fill), (100, 100));
        assert_eq!(fit(&img, 100, 100, FitMode::Inside), (100, 50));
        assert_eq!(fit(&img, 100, 100, FitMode::Outside), (200, 100));
    }

    #[test]
    fn test_single_side_keeps_aspect_ratio() {
        let img = image(400, 200);
        let options = ResizeOptions {
            width: Some(100),
            ..ResizeOptions::default()
        };
        assert_eq!(ImageResize::apply(&img, &options).dimensions(), (100, 50));
    }

    #[test]
    fn test_inside_single_side_never_enlarges() {
        let img = image(100, 50);
        let options = ResizeOptions {
            width: Some(400),
            fit: FitMode::Inside,
            ..ResizeOptions::default()
        };
        assert_eq!(ImageResize::apply(&img, &options).dimensions(), (100, 50));

        let shrink = ResizeOptions {
            height: Some(25),
            fit: FitMode::Inside,
            ..ResizeOptions::default()
        };
        assert_eq!(ImageResize::apply(&img, &shrink).dimensions(), (50, 25));
    }

    #[test]
    fn test_cover_crop_respects_anchor() {
        // Left half red, right half blue
        let mut source = RgbImage::new(200, 100);
        for (x, _, pixel) in source.enumerate_pixels_mut() {
            *pixel = if x < 100 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) };
        }
        let img = DynamicImage::ImageRgb8(source);

        let west = ImageResize::apply(&img, &ResizeOptions::exact(50, 50, FitMode::Cover, Anchor::West));
        assert_eq!(west.to_rgb8().get_pixel(25, 25), &Rgb([255, 0, 0]));

        let east = ImageResize::apply(&img, &ResizeOptions::exact(50, 50, FitMode::Cover, Anchor::East));
        assert_eq!(east.to_rgb8().get_pixel(25, 25), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_contain_pads_with_white() {
        let img = image(200, 100);
        let padded = ImageResize::apply(&img, &ResizeOptions::exact(100, 100, FitMode::Contain, Anchor::North));
        let rgb = padded.to_rgb8();
        assert_eq!(rgb.get_pixel(50, 10), &Rgb([255, 0, 0]));
        assert_eq!(rgb.get_pixel(50, 90), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_select_filter() {
        assert_eq!(
            ImageResize::select_filter(1000, 1000, 100, 100),
            imageops::FilterType::Triangle
        );
        assert_eq!(
            ImageResize::select_filter(100, 100, 100, 100),
            imageops::FilterType::Lanczos3
        );
    }
}
