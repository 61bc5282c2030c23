//! Spatial layout features computed over a fixed grid

use crate::error::ExtractError;
use crate::features::{normalize_l1, quantize, FeatureExtractor};
use image::{GrayImage, RgbImage};

fn luminance(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0.map(f32::from);
        image::Luma([(0.299 * r + 0.587 * g + 0.114 * b).round() as u8])
    })
}

/// Cell index of a pixel in a `grid` × `grid` partition
fn cell(x: u32, y: u32, width: u32, height: u32, grid: usize) -> usize {
    let cx = (x as usize * grid / width as usize).min(grid - 1);
    let cy = (y as usize * grid / height as usize).min(grid - 1);
    cy * grid + cx
}

/// Mean luminance of an 8 × 8 grid
#[derive(Debug, Clone)]
pub struct LuminanceLayout {
    cells: Vec<f32>,
    counts: Vec<u32>,
}

impl LuminanceLayout {
    pub const CODE: &'static str = "ll";
    const GRID: usize = 8;
    pub const DIMENSION: usize = Self::GRID * Self::GRID;

    pub fn new() -> Self {
        Self {
            cells: vec![0.0; Self::DIMENSION],
            counts: vec![0; Self::DIMENSION],
        }
    }
}

impl Default for LuminanceLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor for LuminanceLayout {
    fn code(&self) -> &'static str {
        Self::CODE
    }

    fn extract(&mut self, image: &RgbImage) -> Result<(), ExtractError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ExtractError::EmptyImage);
        }

        self.cells.iter_mut().for_each(|c| *c = 0.0);
        self.counts.iter_mut().for_each(|c| *c = 0);

        let gray = luminance(image);
        for (x, y, pixel) in gray.enumerate_pixels() {
            let index = cell(x, y, width, height, Self::GRID);
            self.cells[index] += f32::from(pixel.0[0]);
            self.counts[index] += 1;
        }

        for (value, count) in self.cells.iter_mut().zip(&self.counts) {
            if *count > 0 {
                *value /= *count as f32 * 255.0;
            }
        }
        Ok(())
    }

    fn serialized_bytes(&self) -> Vec<u8> {
        self.cells
            .iter()
            .map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect()
    }

    fn to_vector(&self) -> &[f32] {
        &self.cells
    }
}

/// Dominant gradient orientation per cell of a 4 × 4 grid
///
/// Orientations are horizontal, vertical, and the two diagonals. Pixels
/// whose gradient magnitude is under the threshold do not vote.
#[derive(Debug, Clone)]
pub struct EdgeHistogram {
    bins: Vec<f32>,
}

impl EdgeHistogram {
    pub const CODE: &'static str = "eh";
    const GRID: usize = 4;
    const ORIENTATIONS: usize = 4;
    const MAGNITUDE_THRESHOLD: f32 = 16.0;
    pub const DIMENSION: usize = Self::GRID * Self::GRID * Self::ORIENTATIONS;

    pub fn new() -> Self {
        Self {
            bins: vec![0.0; Self::DIMENSION],
        }
    }

    fn orientation(dx: f32, dy: f32) -> usize {
        // angle folded into [0, 180)
        let mut angle = dy.atan2(dx).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        (((angle + 22.5) / 45.0) as usize) % Self::ORIENTATIONS
    }
}

impl Default for EdgeHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor for EdgeHistogram {
    fn code(&self) -> &'static str {
        Self::CODE
    }

    fn extract(&mut self, image: &RgbImage) -> Result<(), ExtractError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ExtractError::EmptyImage);
        }

        self.bins.iter_mut().for_each(|b| *b = 0.0);
        if width < 3 || height < 3 {
            return Ok(());
        }

        let gray = luminance(image);
        let at = |x: u32, y: u32| f32::from(gray.get_pixel(x, y).0[0]);

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let dx = at(x + 1, y) - at(x - 1, y);
                let dy = at(x, y + 1) - at(x, y - 1);
                if dx.hypot(dy) < Self::MAGNITUDE_THRESHOLD {
                    continue;
                }
                let index = cell(x, y, width, height, Self::GRID) * Self::ORIENTATIONS
                    + Self::orientation(dx, dy);
                self.bins[index] += 1.0;
            }
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
