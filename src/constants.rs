//! Documented constants for ball detection, calibration and motion estimation.
//!
//! These values are tuned for an ochre ball (~RGB(230, 190, 40)) of 15 cm
//! diameter filmed against a neutral background.

// ============================================================================
// Color Model Constants
// ============================================================================

/// Lower hue bound (degrees) for a qualifying pixel.
pub const HUE_MIN_DEG: f64 = 28.0;

/// Upper hue bound (degrees) for a qualifying pixel.
pub const HUE_MAX_DEG: f64 = 55.0;

/// Minimum HSV saturation in [0, 1].
pub const SATURATION_MIN: f64 = 0.22;

/// Minimum HSV value in [0, 1].
pub const VALUE_MIN: f64 = 0.45;

/// Minimum R+G+B sum; near-black pixels never qualify.
pub const CHANNEL_SUM_MIN: u32 = 120;

// ============================================================================
// Detection & Calibration Constants
// ============================================================================

/// Physical diameter of the tracked ball in meters.
pub const REAL_DIAMETER_M: f64 = 0.15;

/// Qualifying pixels needed before a frame counts as a detection.
pub const MIN_PIXELS_FOR_DETECT: u32 = 40;

/// Qualifying pixels needed before the pixel scale is derived.
pub const MIN_PIXELS_FOR_CALIBRATION: u32 = 200;

/// Bounding-box extents at or below this many pixels are degenerate.
pub const MIN_CALIBRATION_EXTENT_PX: f64 = 2.0;

/// Pixel stride used by the offline analysis pass.
pub const ANALYSIS_STRIDE: u32 = 2;

/// Pixel stride used by the live preview overlay.
pub const PREVIEW_STRIDE: u32 = 4;

// ============================================================================
// Kalman Filter Constants
// ============================================================================

/// Process noise on position (per prediction step).
pub const PROCESS_NOISE_POS: f64 = 1e-5;

/// Process noise on velocity (per prediction step).
pub const PROCESS_NOISE_VEL: f64 = 1e-3;

/// Measurement noise variance for each metric coordinate.
pub const MEASUREMENT_NOISE: f64 = 1e-6;

/// Covariance scale applied when the filter is seeded from a measurement.
pub const SEED_COVARIANCE: f64 = 0.1;

/// Covariance scale of a filter that has never been seeded.
pub const UNSEEDED_COVARIANCE: f64 = 1e3;

/// Innovation covariance determinants below this magnitude are singular.
pub const SINGULAR_DETERMINANT: f64 = 1e-12;

/// Diagonal used in place of the inverse of a singular innovation covariance.
pub const SINGULAR_INVERSE_DIAGONAL: f64 = 1e12;

/// Smallest time step (seconds) handed to the prediction step.
pub const MIN_PREDICT_DT_SEC: f64 = 1e-3;

// ============================================================================
// Sequencing Constants
// ============================================================================

/// Smallest spacing between two analysed frames, in milliseconds.
pub const MIN_FRAME_STEP_MS: f64 = 1.0;

/// Default spacing between two analysed frames, in milliseconds.
pub const DEFAULT_FRAME_STEP_MS: f64 = 10.0;

/// Slack (seconds) when matching a frame timestamp to a sample instant.
pub const SAMPLE_INSTANT_TOLERANCE_SEC: f64 = 1e-4;

/// Interval between two live preview detections, in milliseconds.
pub const PREVIEW_INTERVAL_MS: u64 = 120;

// ============================================================================
// Kinematics Constants
// ============================================================================

/// Gravitational acceleration used for the theoretical reference (m/s²).
pub const GRAVITY: f64 = 9.8;

/// Filtered samples required before a fit is attempted.
pub const MIN_SAMPLES_FOR_FIT: usize = 3;
