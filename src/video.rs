use ffmpeg::format::{input, Pixel};
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{context::Context as ScalerContext, flag::Flags};
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::{codec, decoder, Error as FfmpegError, Packet};
use ffmpeg_next as ffmpeg;
use image::RgbImage;

use crate::error::{AnalysisError, Result};
use crate::sequencer::FrameSource;
use crate::types::TimedFrame;

/// Container durations are expressed in microseconds.
const AV_TIME_BASE: f64 = 1_000_000.0;

// ============================================================================
// Media File Frame Source
// ============================================================================

/// Decodes the best video stream of a media file into RGB frames.
///
/// Timestamps are seconds relative to the first decoded frame.
pub struct VideoFileSource {
    input_ctx: ffmpeg::format::context::Input,
    decoder: decoder::Video,
    scaler: ScalerContext,
    stream_idx: usize,
    time_base: f64,
    duration: Option<f64>,
    first_pts: Option<i64>,
    last_timestamp: f64,
    eof_sent: bool,
}

impl VideoFileSource {
    pub fn open(path: &str) -> Result<Self> {
        ffmpeg::init()?;

        // 1. Open Input
        let input_ctx = input(&path)?;
        let video_stream = input_ctx
            .streams()
            .best(Type::Video)
            .ok_or_else(|| AnalysisError::NoVideoStream(path.to_string()))?;
        let stream_idx = video_stream.index();
        let time_base = f64::from(video_stream.time_base());

        let duration = if video_stream.duration() > 0 {
            Some(video_stream.duration() as f64 * time_base)
        } else if input_ctx.duration() > 0 {
            Some(input_ctx.duration() as f64 / AV_TIME_BASE)
        } else {
            None
        };

        // 2. Create Decoder
        let decoder_context = codec::context::Context::from_parameters(video_stream.parameters())?;
        let decoder = decoder_context.decoder().video()?;

        log::info!(
            "Input found: {}x{} (Codec: {:?}), duration {:?}s",
            decoder.width(),
            decoder.height(),
            decoder.id(),
            duration
        );

        // 3. Scaler to packed RGB24 at native resolution
        let scaler = ScalerContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            Flags::BILINEAR,
        )?;

        Ok(Self {
            input_ctx,
            decoder,
            scaler,
            stream_idx,
            time_base,
            duration,
            first_pts: None,
            last_timestamp: f64::NEG_INFINITY,
            eof_sent: false,
        })
    }

    /// Decode the next frame in presentation order together with its
    /// timestamp, or `None` at end of stream. No pixel conversion happens here.
    fn decode_next(&mut self) -> Result<Option<(f64, VideoFrame)>> {
        let mut decoded = VideoFrame::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let timestamp = self.timestamp_of(&decoded);
                return Ok(Some((timestamp, decoded)));
            }
            if self.eof_sent {
                return Ok(None);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_ctx) {
                Ok(()) => {
                    if packet.stream() == self.stream_idx {
                        self.decoder.send_packet(&packet)?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    log::debug!("Flushing decoder...");
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Seconds since the first decoded frame.
    fn timestamp_of(&mut self, decoded: &VideoFrame) -> f64 {
        let timestamp = match decoded.timestamp().or(decoded.pts()) {
            Some(pts) => {
                let first = *self.first_pts.get_or_insert(pts);
                (pts - first) as f64 * self.time_base
            }
            // Missing timestamps: keep the sequence strictly increasing
            None => self.last_timestamp.max(0.0) + self.time_base,
        };
        self.last_timestamp = timestamp;
        timestamp
    }

    fn convert(&mut self, timestamp: f64, decoded: &VideoFrame) -> Result<TimedFrame> {
        let mut rgb_frame = VideoFrame::empty();
        self.scaler.run(decoded, &mut rgb_frame)?;
        let image = frame_to_image(&rgb_frame)?;

        Ok(TimedFrame { timestamp, image })
    }
}

impl FrameSource for VideoFileSource {
    fn next_frame(&mut self, not_before: f64) -> Result<Option<TimedFrame>> {
        match first_not_before(|| self.decode_next(), not_before)? {
            Some((timestamp, decoded)) => self.convert(timestamp, &decoded).map(Some),
            None => Ok(None),
        }
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }
}

/// Pull timestamped items until one is at or after `not_before`; earlier
/// items are dropped as they are, without any further processing.
pub(crate) fn first_not_before<T>(
    mut next: impl FnMut() -> Result<Option<(f64, T)>>,
    not_before: f64,
) -> Result<Option<(f64, T)>> {
    while let Some((timestamp, item)) = next()? {
        if timestamp >= not_before {
            return Ok(Some((timestamp, item)));
        }
    }
    Ok(None)
}

/// Copy an RGB24 frame into a tightly packed image, honouring the row stride.
fn frame_to_image(frame: &VideoFrame) -> Result<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let stride = frame.stride(0);
    let row_len = width as usize * 3;
    let data = frame.data(0);

    let conversion_error = || AnalysisError::FrameBuffer {
        width,
        height,
        len: data.len(),
    };

    if stride == 0 || stride < row_len || data.len() < stride * height.saturating_sub(1) as usize + row_len {
        return Err(conversion_error());
    }

    let mut buf = Vec::with_capacity(row_len * height as usize);
    for row in data.chunks(stride).take(height as usize) {
        buf.extend_from_slice(&row[..row_len]);
    }

    RgbImage::from_raw(width, height, buf).ok_or_else(conversion_error)
}
