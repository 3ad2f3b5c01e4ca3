use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Image filter configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Grayscale enabled
    #[serde(default)]
    pub grayscale: bool,
    /// Gaussian blur sigma
    pub blur: Option<f32>,
    /// Unsharp-mask sigma
    pub sharpen: Option<f32>,
}

impl FilterConfig {
    pub fn is_empty(&self) -> bool {
        !self.grayscale && self.blur.is_none() && self.sharpen.is_none()
    }
}

pub struct ImageFilters;

impl ImageFilters {
    /// Apply all configured filters: blur, then sharpen, then grayscale
    pub fn apply(img: DynamicImage, config: &FilterConfig) -> DynamicImage {
        let mut result = img;

        if let Some(sigma) = config.blur.filter(|s| *s > 0.0) {
            result = result.blur(sigma);
        }

        if let Some(sigma) = config.sharpen.filter(|s| *s > 0.0) {
            result = result.unsharpen(sigma, 1);
        }

        if config.grayscale {
            result = result.grayscale();
        }

        result
    }
}
