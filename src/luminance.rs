//! RGB to brightness conversion.
//!
//! Brightness is a fixed weighted sum `0.21*R + 0.72*G + 0.07*B`. The weights add
//! up to one, so an 8-bit input stays within `[0, 255]` up to float rounding.

use image::{Rgb, RgbImage};

pub const RED_WEIGHT: f32 = 0.21;
pub const GREEN_WEIGHT: f32 = 0.72;
pub const BLUE_WEIGHT: f32 = 0.07;

/// Brightness of a single pixel. Not clamped.
#[inline]
pub fn brightness(px: Rgb<u8>) -> f32 {
    RED_WEIGHT * px[0] as f32 + GREEN_WEIGHT * px[1] as f32 + BLUE_WEIGHT * px[2] as f32
}

/// Per-pixel brightness of a frame, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct BrightnessGrid {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl BrightnessGrid {
    /// Map every pixel of `image` to its brightness.
    pub fn from_image(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let values = image.pixels().map(|px| brightness(*px)).collect();
        Self { width, height, values }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values.get((y * self.width + x) as usize).copied()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_favor_green() {
        let red = brightness(Rgb([255, 0, 0]));
        let green = brightness(Rgb([0, 255, 0]));
        let blue = brightness(Rgb([0, 0, 255]));
        assert!(green > red && red > blue);
        assert!((red - 53.55).abs() < 1e-3);
        assert!((green - 183.6).abs() < 1e-3);
        assert!((blue - 17.85).abs() < 1e-3);
    }

    #[test]
    fn black_and_white_hit_the_ends() {
        assert_eq!(brightness(Rgb([0, 0, 0])), 0.0);
        let white = brightness(Rgb([255, 255, 255]));
        assert!((white - 255.0).abs() <= 255.0 * 0.0001);
    }

    #[test]
    fn grid_keeps_dimensions_and_order() {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(2, 1, Rgb([255, 255, 255]));
        let grid = BrightnessGrid::from_image(&img);
        assert_eq!((grid.width(), grid.height()), (3, 2));
        assert_eq!(grid.values().len(), 6);
        assert_eq!(grid.get(0, 0), Some(0.0));
        assert!(grid.get(2, 1).is_some_and(|v| v > 254.9));
        assert_eq!(grid.get(3, 0), None);
    }
}
