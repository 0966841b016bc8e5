// Color segmentation: HSV thresholding + centroid of the qualifying pixels
use image::{Rgb, RgbImage};

use crate::constants::{
    CHANNEL_SUM_MIN, HUE_MAX_DEG, HUE_MIN_DEG, MIN_PIXELS_FOR_DETECT, SATURATION_MIN, VALUE_MIN,
};
use crate::types::Blob;

/// Hue in degrees [0, 360), saturation and value in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

/// Convert 8-bit RGB to HSV using the max/min channel formulation.
///
/// Hue is 0 whenever the chroma is 0 (gray pixels).
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max == 0.0 { 0.0 } else { delta / max };

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        let sector = (g - b) / delta;
        60.0 * if g < b { sector + 6.0 } else { sector }
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    Hsv { h, s, v: max }
}

/// Color signature of the tracked ball.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorModel {
    pub hue_min: f64,
    pub hue_max: f64,
    pub saturation_min: f64,
    pub value_min: f64,
    pub channel_sum_min: u32,
}

impl Default for ColorModel {
    fn default() -> Self {
        Self {
            hue_min: HUE_MIN_DEG,
            hue_max: HUE_MAX_DEG,
            saturation_min: SATURATION_MIN,
            value_min: VALUE_MIN,
            channel_sum_min: CHANNEL_SUM_MIN,
        }
    }
}

impl ColorModel {
    /// Whether a pixel belongs to the ball.
    #[inline]
    pub fn qualifies(&self, pixel: &Rgb<u8>) -> bool {
        let [r, g, b] = pixel.0;
        let channel_sum = r as u32 + g as u32 + b as u32;
        if channel_sum < self.channel_sum_min {
            return false;
        }
        let hsv = rgb_to_hsv(r, g, b);
        hsv.h >= self.hue_min
            && hsv.h <= self.hue_max
            && hsv.s >= self.saturation_min
            && hsv.v >= self.value_min
    }
}

/// Locates the ball in a frame as the centroid of its qualifying pixels.
#[derive(Clone, Copy, Debug)]
pub struct ColorSegmenter {
    model: ColorModel,
    min_pixels: u32,
}

impl Default for ColorSegmenter {
    fn default() -> Self {
        Self::new(ColorModel::default(), MIN_PIXELS_FOR_DETECT)
    }
}

impl ColorSegmenter {
    /// `min_pixels` below 1 is raised to 1.
    pub fn new(model: ColorModel, min_pixels: u32) -> Self {
        Self {
            model,
            min_pixels: min_pixels.max(1),
        }
    }

    /// Scan every `stride`-th pixel in both axes and return the centroid of
    /// the qualifying ones.
    ///
    /// Returns `None` when fewer than `min_pixels` sampled pixels qualify;
    /// callers treat that as a missed frame.
    pub fn detect(&self, frame: &RgbImage, stride: u32) -> Option<Blob> {
        let stride = stride.max(1) as usize;
        let (width, height) = frame.dimensions();

        let mut sum_x = 0.0_f64;
        let mut sum_y = 0.0_f64;
        let mut count = 0u32;

        for y in (0..height).step_by(stride) {
            for x in (0..width).step_by(stride) {
                if self.model.qualifies(frame.get_pixel(x, y)) {
                    sum_x += x as f64;
                    sum_y += y as f64;
                    count += 1;
                }
            }
        }

        if count == 0 || count < self.min_pixels {
            log::trace!("Missed frame: {} qualifying pixels", count);
            return None;
        }

        Some(Blob {
            x: sum_x / count as f64,
            y: sum_y / count as f64,
            count,
        })
    }
}
