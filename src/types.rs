use image::RgbImage;

use crate::constants::{
    ANALYSIS_STRIDE, DEFAULT_FRAME_STEP_MS, MIN_FRAME_STEP_MS, MIN_PIXELS_FOR_CALIBRATION,
    MIN_PIXELS_FOR_DETECT, REAL_DIAMETER_M,
};

/// Centroid of the color-qualifying pixels of one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Blob {
    /// Mean column of the qualifying pixels
    pub x: f64,
    /// Mean row of the qualifying pixels
    pub y: f64,
    /// Number of qualifying pixels that were sampled
    pub count: u32,
}

/// One detection, in pixels and (once calibrated) in meters.
#[derive(Clone, Copy, Debug)]
pub struct RawSample {
    pub t: f64,
    pub x_px: f64,
    pub y_px: f64,
    /// `NaN` until the pixel scale is known
    pub x_m: f64,
    /// `NaN` until the pixel scale is known
    pub y_m: f64,
}

/// Filter output for one calibrated measurement.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilteredSample {
    /// Seconds on the (possibly dilated) recording time axis
    pub t: f64,
    pub x: f64,
    pub y: f64,
    /// Velocity in x direction (meters per second)
    pub vx: f64,
    /// Velocity in y direction (meters per second)
    pub vy: f64,
}

impl FilteredSample {
    /// Magnitude of the velocity vector.
    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }
}

/// Snapshot of the estimator state vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionState {
    pub x: f64,
    pub vx: f64,
    pub y: f64,
    pub vy: f64,
}

/// A decoded frame together with its native timestamp in seconds.
#[derive(Clone, Debug)]
pub struct TimedFrame {
    pub timestamp: f64,
    pub image: RgbImage,
}

impl TimedFrame {
    pub fn new(timestamp: f64, image: RgbImage) -> Self {
        Self { timestamp, image }
    }
}

/// Analysis configuration, also passed across the FFI boundary.
///
/// # Time dilation
/// `slow_motion_factor` rescales the recorded time axis (e.g. 0.25 for a
/// clip captured in 4× slow motion). It applies to sample timestamps and to
/// the filter's time step alike; it does not change processing speed.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct AnalysisConfig {
    /// Physical diameter of the ball in meters
    pub reference_diameter_m: f64,
    /// Qualifying pixels needed for a detection
    pub min_pixels_detect: u32,
    /// Qualifying pixels needed for calibration
    pub min_pixels_calibration: u32,
    /// Spacing between analysed frames in milliseconds (floor 1 ms)
    pub frame_step_ms: f64,
    /// Incline angle in degrees, for the theoretical acceleration
    pub slope_angle_deg: f64,
    /// Multiplier applied to native frame timestamps
    pub slow_motion_factor: f64,
    /// Pixel stride for per-frame detection
    pub detection_stride: u32,
    /// Log verbosity level: 0=off, 1=error, 2=warn, 3=info, 4=debug, 5=trace
    pub log_level: i32,
}

impl AnalysisConfig {
    /// Frame spacing in seconds, with the 1 ms floor applied.
    ///
    /// Non-finite or non-positive steps fall back to the default step.
    pub fn step_seconds(&self) -> f64 {
        let step_ms = if self.frame_step_ms.is_finite() && self.frame_step_ms > 0.0 {
            self.frame_step_ms
        } else {
            DEFAULT_FRAME_STEP_MS
        };
        step_ms.max(MIN_FRAME_STEP_MS) / 1000.0
    }

    /// Time dilation factor; anything unusable maps to 1.0.
    pub fn time_scale(&self) -> f64 {
        if self.slow_motion_factor.is_finite() && self.slow_motion_factor > 0.0 {
            self.slow_motion_factor
        } else {
            1.0
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reference_diameter_m: REAL_DIAMETER_M,
            min_pixels_detect: MIN_PIXELS_FOR_DETECT,
            min_pixels_calibration: MIN_PIXELS_FOR_CALIBRATION,
            frame_step_ms: DEFAULT_FRAME_STEP_MS,
            slope_angle_deg: 0.0,
            slow_motion_factor: 1.0,
            detection_stride: ANALYSIS_STRIDE,
            log_level: 3, // Info level by default
        }
    }
}

pub type ProgressCallback = extern "C" fn(percent: f32);
