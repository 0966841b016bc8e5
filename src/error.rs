use thiserror::Error;

use ffmpeg_next as ffmpeg;

/// Errors surfaced by the analysis pipeline and its adapters.
///
/// Missed detections and pending calibration are not errors; they are
/// ordinary per-frame outcomes and never show up here.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("ffmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg::Error),

    #[error("no video stream found in {0}")]
    NoVideoStream(String),

    #[error("frame conversion failed: {width}x{height} frame with {len} bytes")]
    FrameBuffer { width: u32, height: u32, len: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("insufficient data: {found} filtered samples, at least {required} required")]
    InsufficientData { found: usize, required: usize },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
