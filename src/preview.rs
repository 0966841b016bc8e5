// Real-time overlay: periodic coarse detection, independent of any analysis pass
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use image::RgbImage;

use crate::constants::{PREVIEW_INTERVAL_MS, PREVIEW_STRIDE};
use crate::error::Result;
use crate::overlay::annotate_blob;
use crate::segmentation::ColorSegmenter;
use crate::sequencer::{CancelToken, FrameSource};
use crate::types::Blob;

/// Cancellable periodic task that marks the ball on incoming frames.
#[derive(Clone, Debug)]
pub struct LivePreview {
    segmenter: ColorSegmenter,
    stride: u32,
    interval: Duration,
}

impl Default for LivePreview {
    fn default() -> Self {
        Self {
            segmenter: ColorSegmenter::default(),
            stride: PREVIEW_STRIDE,
            interval: Duration::from_millis(PREVIEW_INTERVAL_MS),
        }
    }
}

impl LivePreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride.max(1);
        self
    }

    /// Detect on one frame and draw the marker in place.
    pub fn process(&self, frame: &mut RgbImage) -> Option<Blob> {
        let blob = self.segmenter.detect(frame, self.stride);
        if let Some(blob) = &blob {
            annotate_blob(frame, blob);
        }
        blob
    }

    /// Run on a background thread until cancelled or the source ends.
    ///
    /// `on_frame` receives every annotated frame and its detection. Sources
    /// that cannot cross threads, such as
    /// [`VideoFileSource`](crate::video::VideoFileSource) whose scaling
    /// context is not `Send`, go through [`spawn_with`](Self::spawn_with).
    pub fn spawn<S, F>(self, source: S, on_frame: F) -> PreviewHandle
    where
        S: FrameSource + Send + 'static,
        F: FnMut(RgbImage, Option<Blob>) + Send + 'static,
    {
        self.spawn_with(move || Ok(source), on_frame)
    }

    /// Like [`spawn`](Self::spawn), building the source on the preview
    /// thread itself. A failing `open` ends the task before any frame.
    pub fn spawn_with<S, O, F>(self, open: O, mut on_frame: F) -> PreviewHandle
    where
        S: FrameSource + 'static,
        O: FnOnce() -> Result<S> + Send + 'static,
        F: FnMut(RgbImage, Option<Blob>) + Send + 'static,
    {
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let thread = thread::spawn(move || {
            let mut source = match open() {
                Ok(source) => source,
                Err(e) => {
                    log::error!("Live preview source failed to open: {}", e);
                    return 0;
                }
            };

            let mut shown = 0usize;
            while !token.is_cancelled() {
                let started = Instant::now();
                match source.next_frame(f64::NEG_INFINITY) {
                    Ok(Some(frame)) => {
                        let mut image = frame.image;
                        let blob = self.process(&mut image);
                        on_frame(image, blob);
                        shown += 1;
                    }
                    Ok(None) => break,
                    Err(e) => log::warn!("Preview frame skipped: {}", e),
                }
                thread::sleep(self.interval.saturating_sub(started.elapsed()));
            }
            log::debug!("Live preview stopped after {} frames", shown);
            shown
        });

        PreviewHandle { cancel, thread }
    }
}

/// Handle to a running [`LivePreview`].
pub struct PreviewHandle {
    cancel: CancelToken,
    thread: JoinHandle<usize>,
}

impl PreviewHandle {
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Cancel the task and wait for it; returns the number of frames shown.
    pub fn stop(self) -> usize {
        self.cancel.cancel();
        self.thread.join().unwrap_or_else(|_| {
            log::error!("Live preview thread panicked");
            0
        })
    }
}
