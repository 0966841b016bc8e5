//! Ball kinematics from video: color segmentation, pixel-scale calibration,
//! Kalman filtering and a through-origin acceleration fit.

use std::ffi::{c_char, CStr};

pub mod calibration;
pub mod constants;
pub mod error;
pub mod export;
pub mod fitting;
pub mod kalman;
pub mod logging;
pub mod overlay;
pub mod preview;
pub mod segmentation;
pub mod sequencer;
pub mod types;
pub mod video;


pub use calibration::ScaleCalibrator;
pub use error::{AnalysisError, Result};
pub use export::{export_filtered_to_csv, write_filtered_csv, AnalysisSummary};
pub use fitting::{theoretical_acceleration, FitResult, KinematicFitter};
pub use kalman::MotionEstimator;
pub use preview::{LivePreview, PreviewHandle};
pub use segmentation::{rgb_to_hsv, ColorModel, ColorSegmenter, Hsv};
pub use sequencer::{
    AnalysisReport, CancelToken, FitOutcome, FrameOutcome, FrameSequence, FrameSequencer,
    FrameSource, RunEnd,
};
pub use types::{
    AnalysisConfig, Blob, FilteredSample, MotionState, ProgressCallback, RawSample, TimedFrame,
};
pub use video::VideoFileSource;

/// Analyze a media file end to end with the given configuration.
pub fn analyze_file(path: &str, config: AnalysisConfig) -> Result<AnalysisReport> {
    let mut source = VideoFileSource::open(path)?;
    Ok(FrameSequencer::new(config).run(&mut source))
}

// ============================================================================
// FFI
// ============================================================================

pub const STATUS_OK: i32 = 0;
/// A fit ran but its estimate is not a finite number
pub const STATUS_NO_FIT: i32 = 1;
/// Fewer than three filtered samples; no fit was attempted
pub const STATUS_INSUFFICIENT_DATA: i32 = 2;
pub const STATUS_INVALID_ARGUMENT: i32 = -1;
pub const STATUS_OPEN_FAILED: i32 = -2;

/// Analysis result handed across the FFI boundary.
///
/// `samples` is owned by Rust and must be released with
/// [`free_analysis_result`].
#[repr(C)]
pub struct CAnalysisResult {
    pub samples: *mut FilteredSample,
    pub len: usize,
    pub raw_count: usize,
    /// `NaN` when no fit is available
    pub a_estimated: f64,
    pub a_theory: f64,
    /// `NaN` when calibration never succeeded
    pub px_to_meter: f64,
    /// Non-zero when the pass stopped early (cancel or frame fault)
    pub interrupted: i32,
    pub status: i32,
}

impl CAnalysisResult {
    fn failed(status: i32) -> Self {
        Self {
            samples: std::ptr::null_mut(),
            len: 0,
            raw_count: 0,
            a_estimated: f64::NAN,
            a_theory: f64::NAN,
            px_to_meter: f64::NAN,
            interrupted: 0,
            status,
        }
    }

    fn from_report(report: AnalysisReport) -> Self {
        let (a_estimated, status) = match &report.fit {
            FitOutcome::Fitted(fit) => match fit.estimate() {
                Some(a) => (a, STATUS_OK),
                None => (f64::NAN, STATUS_NO_FIT),
            },
            FitOutcome::InsufficientData { .. } => (f64::NAN, STATUS_INSUFFICIENT_DATA),
        };

        let len = report.filtered_samples.len();
        let samples = if len == 0 {
            std::ptr::null_mut()
        } else {
            Box::into_raw(report.filtered_samples.into_boxed_slice()) as *mut FilteredSample
        };

        Self {
            samples,
            len,
            raw_count: report.raw_samples.len(),
            a_estimated,
            a_theory: report.a_theory,
            px_to_meter: report.px_to_meter.unwrap_or(f64::NAN),
            interrupted: (report.end != RunEnd::Completed) as i32,
            status,
        }
    }
}

#[no_mangle]
pub extern "C" fn analyze_video_file(
    path_ptr: *const c_char,
    config: AnalysisConfig,
    progress_callback: Option<ProgressCallback>,
) -> CAnalysisResult {
    logging::init_logging(config.log_level);

    if path_ptr.is_null() {
        log::error!("analyze_video_file called with a null path");
        return CAnalysisResult::failed(STATUS_INVALID_ARGUMENT);
    }

    // Caller guarantees a NUL-terminated string that outlives this call
    let path = match unsafe { CStr::from_ptr(path_ptr) }.to_str() {
        Ok(path) => path,
        Err(e) => {
            log::error!("Input path is not valid UTF-8: {}", e);
            return CAnalysisResult::failed(STATUS_INVALID_ARGUMENT);
        }
    };

    let mut source = match VideoFileSource::open(path) {
        Ok(source) => source,
        Err(e) => {
            log::error!("Failed to open {}: {}", path, e);
            return CAnalysisResult::failed(STATUS_OPEN_FAILED);
        }
    };

    let report = FrameSequencer::new(config).run_with_progress(&mut source, |p| {
        if let Some(callback) = progress_callback {
            callback(p);
        }
    });

    CAnalysisResult::from_report(report)
}

#[no_mangle]
pub extern "C" fn free_analysis_result(result: CAnalysisResult) {
    if result.samples.is_null() || result.len == 0 {
        return;
    }
    // Rebuild the boxed slice allocated in `from_report` and drop it
    unsafe {
        let slice = std::ptr::slice_from_raw_parts_mut(result.samples, result.len);
        drop(Box::from_raw(slice));
    }
}
