//! Image decoding and normalization
//!
//! Every consumer turns staged bytes into an 8-bit RGB working copy, trims
//! the near-white border around the subject, and brings the image to a
//! workable size before any feature is extracted.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Channel value at or above which a pixel counts as background
const WHITE_THRESHOLD: u8 = 250;

/// Side length below which an image is too small to describe
pub const MIN_SIDE_LENGTH: u32 = 32;

/// Longer side of an upscaled tiny image
pub const UPSCALE_SIDE_LENGTH: u32 = 128;

/// `max_side_length` values at or below this disable downscaling
pub const MAX_SIDE_DISABLED_BELOW: u32 = 50;

/// Normalization settings shared by all consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Crop the white border before scaling
    pub trim_whitespace: bool,

    /// Longest allowed side; see [`MAX_SIDE_DISABLED_BELOW`]
    pub max_side_length: u32,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            trim_whitespace: true,
            max_side_length: 512,
        }
    }
}

/// Decode raw bytes into an RGB working copy
pub fn decode(bytes: &[u8]) -> Result<RgbImage, image::ImageError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Trim, then scale down to the maximum side or upscale tiny images
pub fn normalize(image: RgbImage, options: &NormalizeOptions) -> RgbImage {
    let image = if options.trim_whitespace {
        trim_whitespace(image)
    } else {
        image
    };

    let (width, height) = image.dimensions();
    if options.max_side_length > MAX_SIDE_DISABLED_BELOW {
        scale_to_max_side(image, options.max_side_length)
    } else if width < MIN_SIDE_LENGTH || height < MIN_SIDE_LENGTH {
        let factor = UPSCALE_SIDE_LENGTH as f64 / width.max(height) as f64;
        let new_width = ((width as f64 * factor) as u32).max(1);
        let new_height = ((height as f64 * factor) as u32).max(1);
        imageops::resize(&image, new_width, new_height, FilterType::Triangle)
    } else {
        image
    }
}

/// Scale down so the longer side is at most `max_side`; smaller images pass through
pub fn scale_to_max_side(image: RgbImage, max_side: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let longer = width.max(height);
    if longer <= max_side {
        return image;
    }

    let factor = max_side as f64 / longer as f64;
    let new_width = ((width as f64 * factor).round() as u32).max(1);
    let new_height = ((height as f64 * factor).round() as u32).max(1);
    imageops::resize(&image, new_width, new_height, FilterType::Triangle)
}

/// Crop to the bounding box of non-background pixels
///
/// An image that is entirely background is returned unchanged.
pub fn trim_whitespace(image: RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut min_x = width;
    let mut min_y = height;
    let mut max_x = 0;
    let mut max_y = 0;

    for (x, y, pixel) in image.enumerate_pixels() {
        if !is_background(pixel) {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if min_x > max_x || min_y > max_y {
        return image;
    }

    let crop_width = max_x - min_x + 1;
    let crop_height = max_y - min_y + 1;
    if crop_width == width && crop_height == height {
        return image;
    }

    imageops::crop_imm(&image, min_x, min_y, crop_width, crop_height).to_image()
}

fn is_background(pixel: &Rgb<u8>) -> bool {
    pixel.0.iter().all(|&c| c >= WHITE_THRESHOLD)
}
