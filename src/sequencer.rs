use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::calibration::ScaleCalibrator;
use crate::constants::{MIN_PREDICT_DT_SEC, MIN_SAMPLES_FOR_FIT, SAMPLE_INSTANT_TOLERANCE_SEC};
use crate::error::{AnalysisError, Result};
use crate::fitting::{theoretical_acceleration, FitResult, KinematicFitter};
use crate::kalman::MotionEstimator;
use crate::segmentation::{ColorModel, ColorSegmenter};
use crate::types::{AnalysisConfig, Blob, FilteredSample, RawSample, TimedFrame};

// ============================================================================
// Frame Sources
// ============================================================================

/// Supplies decoded frames in increasing timestamp order.
pub trait FrameSource {
    /// First frame whose native timestamp is at or after `not_before`
    /// (seconds), or `Ok(None)` once the sequence is exhausted.
    fn next_frame(&mut self, not_before: f64) -> Result<Option<TimedFrame>>;

    /// Total length in seconds, when known. Only used for progress reporting.
    fn duration(&self) -> Option<f64> {
        None
    }
}

/// In-memory frame source over already decoded frames.
#[derive(Clone, Debug, Default)]
pub struct FrameSequence {
    frames: Vec<TimedFrame>,
    cursor: usize,
}

impl FrameSequence {
    pub fn new(frames: Vec<TimedFrame>) -> Self {
        Self { frames, cursor: 0 }
    }

    /// Restart from the first frame.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for FrameSequence {
    fn next_frame(&mut self, not_before: f64) -> Result<Option<TimedFrame>> {
        while let Some(frame) = self.frames.get(self.cursor) {
            self.cursor += 1;
            if frame.timestamp >= not_before {
                return Ok(Some(frame.clone()));
            }
        }
        Ok(None)
    }

    fn duration(&self) -> Option<f64> {
        self.frames.last().map(|f| f.timestamp)
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative cancellation flag shared between a run and its controller.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Run Results
// ============================================================================

/// Why a pass stopped requesting frames.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEnd {
    /// The source ran out of frames
    Completed,
    /// The cancel token was raised between two frames
    Cancelled,
    /// A frame could not be obtained or processed; carries the error text
    Faulted(String),
}

/// Result of the final fitting step.
#[derive(Clone, Debug, PartialEq)]
pub enum FitOutcome {
    Fitted(FitResult),
    InsufficientData { found: usize, required: usize },
}

impl FitOutcome {
    pub fn fit(&self) -> Option<&FitResult> {
        match self {
            FitOutcome::Fitted(fit) => Some(fit),
            FitOutcome::InsufficientData { .. } => None,
        }
    }
}

/// What happened to a single frame during a pass.
#[derive(Clone, Copy, Debug)]
pub struct FrameOutcome {
    /// Zero-based index among the processed frames
    pub index: usize,
    /// Dilated timestamp in seconds
    pub t: f64,
    pub blob: Option<Blob>,
    pub raw: Option<RawSample>,
    pub filtered: Option<FilteredSample>,
    /// Scale in effect after this frame
    pub px_to_meter: Option<f64>,
}

/// Everything one analysis pass produced.
#[derive(Clone, Debug)]
pub struct AnalysisReport {
    pub raw_samples: Vec<RawSample>,
    pub filtered_samples: Vec<FilteredSample>,
    /// Meters per pixel, if calibration succeeded
    pub px_to_meter: Option<f64>,
    /// Zero-based index (among processed frames) of the calibration frame
    pub calibration_frame: Option<usize>,
    pub frames_processed: usize,
    pub end: RunEnd,
    pub fit: FitOutcome,
    /// g·sin(θ) for the configured slope, available even without a fit
    pub a_theory: f64,
}

// ============================================================================
// Per-run State
// ============================================================================

/// State owned by a single pass; dropped when the pass finalizes.
struct RunContext {
    px_to_meter: Option<f64>,
    calibration_frame: Option<usize>,
    estimator: MotionEstimator,
    raw: Vec<RawSample>,
    filtered: Vec<FilteredSample>,
    prev_t: Option<f64>,
    last_timestamp: Option<f64>,
    frames_processed: usize,
}

impl RunContext {
    fn new() -> Self {
        Self {
            px_to_meter: None,
            calibration_frame: None,
            estimator: MotionEstimator::new(),
            raw: Vec::new(),
            filtered: Vec::new(),
            prev_t: None,
            last_timestamp: None,
            frames_processed: 0,
        }
    }
}

// ============================================================================
// Sequencer
// ============================================================================

/// Drives segmentation, calibration, filtering and fitting over one source.
#[derive(Clone, Debug)]
pub struct FrameSequencer {
    config: AnalysisConfig,
    segmenter: ColorSegmenter,
    calibrator: ScaleCalibrator,
    fitter: KinematicFitter,
    cancel: CancelToken,
}

impl FrameSequencer {
    pub fn new(config: AnalysisConfig) -> Self {
        let model = ColorModel::default();
        Self {
            config,
            segmenter: ColorSegmenter::new(model, config.min_pixels_detect),
            calibrator: ScaleCalibrator::new(
                model,
                config.reference_diameter_m,
                config.min_pixels_calibration,
            ),
            fitter: KinematicFitter::new(config.slope_angle_deg),
            cancel: CancelToken::new(),
        }
    }

    /// Share an externally owned cancel token with this sequencer.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn run<S: FrameSource + ?Sized>(&self, source: &mut S) -> AnalysisReport {
        self.run_with_progress(source, |_| {})
    }

    /// Run one full analysis pass. Progress is reported in [0, 1] when the
    /// source knows its duration.
    pub fn run_with_progress<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        progress_callback: impl FnMut(f32),
    ) -> AnalysisReport {
        self.run_observed(source, progress_callback, |_, _| {})
    }

    /// Like [`run_with_progress`](Self::run_with_progress), also handing every
    /// processed frame and its outcome to `observer` (e.g. for overlays).
    pub fn run_observed<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        mut progress_callback: impl FnMut(f32),
        mut observer: impl FnMut(&TimedFrame, &FrameOutcome),
    ) -> AnalysisReport {
        let step = self.config.step_seconds();
        let duration = source.duration().filter(|d| d.is_finite() && *d > 0.0);

        log::info!(
            "Starting analysis: step={:.1}ms, time scale={}, slope={}°",
            step * 1000.0,
            self.config.time_scale(),
            self.config.slope_angle_deg
        );
        progress_callback(0.0);

        let mut ctx = RunContext::new();
        let mut instant = 0.0_f64;

        let end = loop {
            if self.cancel.is_cancelled() {
                log::info!("Analysis cancelled after {} frames", ctx.frames_processed);
                break RunEnd::Cancelled;
            }

            let frame = match source.next_frame(instant) {
                Ok(Some(frame)) => frame,
                Ok(None) => break RunEnd::Completed,
                Err(e) => {
                    log::error!("Frame source failed at {:.4}s: {}", instant, e);
                    break RunEnd::Faulted(e.to_string());
                }
            };

            match self.process_frame(&mut ctx, &frame) {
                Ok(outcome) => observer(&frame, &outcome),
                Err(e) => {
                    log::error!("Frame at {:.4}s failed: {}", frame.timestamp, e);
                    break RunEnd::Faulted(e.to_string());
                }
            }

            if let Some(total) = duration {
                progress_callback((frame.timestamp / total).clamp(0.0, 1.0) as f32);
            }

            instant = frame.timestamp + step - SAMPLE_INSTANT_TOLERANCE_SEC;
        };

        let report = self.finalize(ctx, end);
        progress_callback(1.0);
        report
    }

    fn process_frame(&self, ctx: &mut RunContext, frame: &TimedFrame) -> Result<FrameOutcome> {
        if !frame.timestamp.is_finite() {
            return Err(AnalysisError::InvalidInput(format!(
                "non-finite frame timestamp {}",
                frame.timestamp
            )));
        }
        if let Some(last) = ctx.last_timestamp {
            if frame.timestamp <= last {
                return Err(AnalysisError::InvalidInput(format!(
                    "frame timestamp {} not after {}",
                    frame.timestamp, last
                )));
            }
        }
        ctx.last_timestamp = Some(frame.timestamp);
        let frame_index = ctx.frames_processed;
        ctx.frames_processed += 1;

        let blob = self
            .segmenter
            .detect(&frame.image, self.config.detection_stride);

        if ctx.px_to_meter.is_none() {
            if let Some(scale) = self.calibrator.estimate(&frame.image) {
                log::info!(
                    "Calibrated at frame #{}: {:.6} m/px",
                    frame_index,
                    scale
                );
                ctx.px_to_meter = Some(scale);
                ctx.calibration_frame = Some(frame_index);
            }
        }

        let t = frame.timestamp * self.config.time_scale();
        let mut outcome = FrameOutcome {
            index: frame_index,
            t,
            blob,
            raw: None,
            filtered: None,
            px_to_meter: ctx.px_to_meter,
        };

        let Some(blob) = blob else {
            log::debug!("Frame #{}: no detection", frame_index);
            return Ok(outcome);
        };

        let (x_m, y_m) = match ctx.px_to_meter {
            Some(scale) => (blob.x * scale, blob.y * scale),
            None => (f64::NAN, f64::NAN),
        };
        let raw = RawSample {
            t,
            x_px: blob.x,
            y_px: blob.y,
            x_m,
            y_m,
        };
        ctx.raw.push(raw);
        outcome.raw = Some(raw);

        if !(x_m.is_finite() && y_m.is_finite()) {
            return Ok(outcome);
        }

        let z = [x_m, y_m];
        match ctx.prev_t {
            None => {
                ctx.estimator.seed(z);
                log::debug!("Frame #{}: estimator seeded at t={:.4}", frame_index, t);
            }
            Some(prev_t) => {
                let dt = (t - prev_t).max(MIN_PREDICT_DT_SEC);
                ctx.estimator.predict(dt);
                ctx.estimator.update(z);

                let state = ctx.estimator.state();
                let sample = FilteredSample {
                    t,
                    x: state.x,
                    y: state.y,
                    vx: state.vx,
                    vy: state.vy,
                };
                ctx.filtered.push(sample);
                outcome.filtered = Some(sample);
                log::trace!(
                    "Frame #{}: t={:.4} pos=({:.4}, {:.4}) vel=({:.4}, {:.4})",
                    frame_index,
                    t,
                    state.x,
                    state.y,
                    state.vx,
                    state.vy
                );
            }
        }
        ctx.prev_t = Some(t);

        Ok(outcome)
    }

    fn finalize(&self, ctx: RunContext, end: RunEnd) -> AnalysisReport {
        if ctx.px_to_meter.is_none() {
            log::warn!("No calibration after {} frames", ctx.frames_processed);
        }

        let fit = match self.fitter.fit(&ctx.filtered) {
            Ok(fit) => FitOutcome::Fitted(fit),
            Err(e) => {
                log::warn!("Fit skipped: {}", e);
                FitOutcome::InsufficientData {
                    found: ctx.filtered.len(),
                    required: MIN_SAMPLES_FOR_FIT,
                }
            }
        };

        log::info!(
            "Analysis finished ({:?}): {} frames, {} raw, {} filtered samples",
            end,
            ctx.frames_processed,
            ctx.raw.len(),
            ctx.filtered.len()
        );

        AnalysisReport {
            raw_samples: ctx.raw,
            filtered_samples: ctx.filtered,
            px_to_meter: ctx.px_to_meter,
            calibration_frame: ctx.calibration_frame,
            frames_processed: ctx.frames_processed,
            end,
            fit,
            a_theory: theoretical_acceleration(self.config.slope_angle_deg),
        }
    }
}
