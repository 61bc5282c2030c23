//! Global color histograms

use crate::error::ExtractError;
use crate::features::{normalize_l1, quantize, FeatureExtractor};
use image::RgbImage;

/// Bins per channel (4 × 4 × 4 = 64 bins)
const BINS_PER_CHANNEL: usize = 4;

/// RGB color histogram, 64 bins
#[derive(Debug, Clone)]
pub struct ColorHistogram {
    bins: Vec<f32>,
}

impl ColorHistogram {
    pub const CODE: &'static str = "ch";
    pub const DIMENSION: usize = BINS_PER_CHANNEL * BINS_PER_CHANNEL * BINS_PER_CHANNEL;

    pub fn new() -> Self {
        Self {
            bins: vec![0.0; Self::DIMENSION],
        }
    }
}

impl Default for ColorHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor for ColorHistogram {
    fn code(&self) -> &'static str {
        Self::CODE
    }

    fn extract(&mut self, image: &RgbImage) -> Result<(), ExtractError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ExtractError::EmptyImage);
        }

        self.bins.iter_mut().for_each(|b| *b = 0.0);
        for pixel in image.pixels() {
            let [r, g, b] = pixel.0.map(|c| c as usize * BINS_PER_CHANNEL / 256);
            self.bins[(r * BINS_PER_CHANNEL + g) * BINS_PER_CHANNEL + b] += 1.0;
        }
        normalize_l1(&mut self.bins);
        Ok(())
    }

    fn serialized_bytes(&self) -> Vec<u8> {
        quantize(&self.bins)
    }

    fn to_vector(&self) -> &[f32] {
        &self.bins
    }
}

/// Histogram over the opponent color space, 64 bins
///
/// O1 = (R - G) / 2, O2 = (R + G - 2B) / 4, O3 = (R + G + B) / 3, each
/// shifted into 0..=255 and split into four bins.
#[derive(Debug, Clone)]
pub struct OpponentHistogram {
    bins: Vec<f32>,
}

impl OpponentHistogram {
    pub const CODE: &'static str = "oh";
    pub const DIMENSION: usize = BINS_PER_CHANNEL * BINS_PER_CHANNEL * BINS_PER_CHANNEL;

    pub fn new() -> Self {
        Self {
            bins: vec![0.0; Self::DIMENSION],
        }
    }

    fn bin(value: f32) -> usize {
        ((value.clamp(0.0, 255.0) as usize) * BINS_PER_CHANNEL / 256).min(BINS_PER_CHANNEL - 1)
    }
}

impl Default for OpponentHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor for OpponentHistogram {
    fn code(&self) -> &'static str {
        Self::CODE
    }

    fn extract(&mut self, image: &RgbImage) -> Result<(), ExtractError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ExtractError::EmptyImage);
        }

        self.bins.iter_mut().for_each(|b| *b = 0.0);
        for pixel in image.pixels() {
            let [r, g, b] = pixel.0.map(f32::from);
            let o1 = (r - g) / 2.0 + 127.5;
            let o2 = (r + g - 2.0 * b) / 4.0 + 127.5;
            let o3 = (r + g + b) / 3.0;
            let index = (Self::bin(o1) * BINS_PER_CHANNEL + Self::bin(o2)) * BINS_PER_CHANNEL
                + Self::bin(o3);
            self.bins[index] += 1.0;
        }
        normalize_l1(&mut self.bins);
        Ok(())
    }

    fn serialized_bytes(&self) -> Vec<u8> {
        quantize(&self.bins)
    }

    fn to_vector(&self) -> &[f32] {
        &self.bins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_color_histogram_single_color() {
        let image = RgbImage::from_pixel(10, 10, Rgb([255, 0, 0]));
        let mut feature = ColorHistogram::new();
        feature.extract(&image).unwrap();

        // r = 3, g = 0, b = 0
        let v = feature.to_vector();
        assert_eq!(v[48], 1.0);
        assert!((v.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert_eq!(feature.serialized_bytes()[48], 255);
    }

    #[test]
    fn test_extract_replaces_previous_result() {
        let mut feature = ColorHistogram::new();
        feature
            .extract(&RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])))
            .unwrap();
        feature
            .extract(&RgbImage::from_pixel(4, 4, Rgb([255, 255, 255])))
            .unwrap();

        let v = feature.to_vector();
        assert_eq!(v[0], 0.0);
        assert_eq!(v[63], 1.0);
    }

    #[test]
    fn test_opponent_histogram_gray_is_centered() {
        let image = RgbImage::from_pixel(8, 8, Rgb([128, 128, 128]));
        let mut feature = OpponentHistogram::new();
        feature.extract(&image).unwrap();

        // O1 = O2 = 127.5 fall in bin 1, O3 = 128 in bin 2
        let index = (4 + 1) * 4 + 2;
        assert_eq!(feature.to_vector()[index], 1.0);
    }

    #[test]
    fn test_empty_image_is_an_error() {
        let mut feature = OpponentHistogram::new();
        assert!(matches!(
            feature.extract(&RgbImage::new(0, 0)),
            Err(ExtractError::EmptyImage)
        ));
    }
}
