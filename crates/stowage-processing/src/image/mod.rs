//! Image processing module
//!
//! Geometry and pixel operations used by the transformer:
//! - EXIF auto-orientation (orientation)
//! - Fit-mode resizing and anchored cropping (resize)
//! - Watermark compositing (watermark)
//! - Grayscale, blur and sharpen (filters)

pub mod filters;
pub mod orientation;
pub mod resize;
pub mod watermark;

// Re-export commonly used types
pub use filters::{FilterConfig, ImageFilters};
pub use orientation::ImageOrientation;
pub use resize::{ImageResize, ResizeOptions};
pub use watermark::{Watermark, WatermarkConfig};
