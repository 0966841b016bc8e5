use image::RgbImage;

use crate::constants::{MIN_CALIBRATION_EXTENT_PX, MIN_PIXELS_FOR_CALIBRATION, REAL_DIAMETER_M};
use crate::segmentation::ColorModel;

/// Derives the meters-per-pixel scale from the apparent size of the ball.
#[derive(Clone, Copy, Debug)]
pub struct ScaleCalibrator {
    model: ColorModel,
    reference_diameter_m: f64,
    min_pixels: u32,
}

impl Default for ScaleCalibrator {
    fn default() -> Self {
        Self::new(ColorModel::default(), REAL_DIAMETER_M, MIN_PIXELS_FOR_CALIBRATION)
    }
}

impl ScaleCalibrator {
    /// A reference diameter that is not finite and positive falls back to
    /// 0.15 m; `min_pixels` below 1 is raised to 1.
    pub fn new(model: ColorModel, reference_diameter_m: f64, min_pixels: u32) -> Self {
        let usable = reference_diameter_m.is_finite() && reference_diameter_m > 0.0;
        let reference_diameter_m = if usable {
            reference_diameter_m
        } else {
            log::warn!(
                "Invalid reference diameter {}, using {} m",
                reference_diameter_m,
                REAL_DIAMETER_M
            );
            REAL_DIAMETER_M
        };
        Self {
            model,
            reference_diameter_m,
            min_pixels: min_pixels.max(1),
        }
    }

    pub fn reference_diameter_m(&self) -> f64 {
        self.reference_diameter_m
    }

    /// Estimate meters per pixel from one full-resolution frame.
    ///
    /// The diameter is the larger side of the bounding box of all qualifying
    /// pixels. Returns `None` with fewer than `min_pixels` qualifying pixels
    /// or an extent of 2 px or less.
    pub fn estimate(&self, frame: &RgbImage) -> Option<f64> {
        let mut found = 0u32;
        let (mut min_x, mut max_x) = (u32::MAX, 0u32);
        let (mut min_y, mut max_y) = (u32::MAX, 0u32);

        for (x, y, pixel) in frame.enumerate_pixels() {
            if !self.model.qualifies(pixel) {
                continue;
            }
            found += 1;
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        if found == 0 || found < self.min_pixels {
            return None;
        }

        let diameter_px = (max_x - min_x).max(max_y - min_y) as f64;
        if diameter_px <= MIN_CALIBRATION_EXTENT_PX {
            log::debug!("Calibration rejected: degenerate extent {} px", diameter_px);
            return None;
        }

        Some(self.reference_diameter_m / diameter_px)
    }
}
