use image::{Rgb, RgbImage};

use crate::sequencer::FrameOutcome;
use crate::types::Blob;

/// Ring marker drawn over a frame.
#[derive(Clone, Copy, Debug)]
pub struct Marker {
    pub radius: f32,
    pub thickness: f32,
    pub color: Rgb<u8>,
    pub alpha: f32,
}

/// Raw detection, red.
pub const RAW_MARKER: Marker = Marker {
    radius: 6.0,
    thickness: 2.0,
    color: Rgb([255, 0, 0]),
    alpha: 0.7,
};

/// Filtered estimate, cyan.
pub const FILTERED_MARKER: Marker = Marker {
    radius: 10.0,
    thickness: 2.0,
    color: Rgb([0, 255, 255]),
    alpha: 1.0,
};

/// Live preview detection, lime.
pub const PREVIEW_MARKER: Marker = Marker {
    radius: 12.0,
    thickness: 3.0,
    color: Rgb([0, 255, 0]),
    alpha: 1.0,
};

/// Blend an anti-aliased ring centred on (cx, cy) into the frame.
pub fn draw_ring(frame: &mut RgbImage, cx: f32, cy: f32, marker: &Marker) {
    if !(cx.is_finite() && cy.is_finite()) {
        return;
    }
    let (width, height) = frame.dimensions();
    let reach = marker.radius + marker.thickness;

    // Integer bounding box, clamped to the frame
    let start_x = (cx - reach).floor().max(0.0) as i64;
    let start_y = (cy - reach).floor().max(0.0) as i64;
    let end_x = ((cx + reach).ceil() as i64).min(width as i64 - 1);
    let end_y = ((cy + reach).ceil() as i64).min(height as i64 - 1);

    let half = marker.thickness / 2.0;
    for py in start_y..=end_y {
        for px in start_x..=end_x {
            let dx = px as f32 - cx;
            let dy = py as f32 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            // Coverage falls off linearly over one pixel at both ring edges
            let coverage = (half + 0.5 - (dist - marker.radius).abs()).clamp(0.0, 1.0);
            if coverage <= 0.0 {
                continue;
            }
            let alpha = marker.alpha * coverage;
            let pixel = frame.get_pixel_mut(px as u32, py as u32);
            for c in 0..3 {
                pixel.0[c] = blend(pixel.0[c], marker.color.0[c], alpha);
            }
        }
    }
}

#[inline(always)]
fn blend(bg: u8, fg: u8, alpha: f32) -> u8 {
    ((bg as f32 * (1.0 - alpha)) + (fg as f32 * alpha)).clamp(0.0, 255.0) as u8
}

/// Mark a live-preview detection.
pub fn annotate_blob(frame: &mut RgbImage, blob: &Blob) {
    draw_ring(frame, blob.x as f32, blob.y as f32, &PREVIEW_MARKER);
}

/// Mark the raw detection and, once filtered, the estimate (converted back
/// to pixels) for one analysed frame.
pub fn annotate_outcome(frame: &mut RgbImage, outcome: &FrameOutcome) {
    if let Some(raw) = &outcome.raw {
        draw_ring(frame, raw.x_px as f32, raw.y_px as f32, &RAW_MARKER);
    }
    if let (Some(filtered), Some(scale)) = (&outcome.filtered, outcome.px_to_meter) {
        draw_ring(
            frame,
            (filtered.x / scale) as f32,
            (filtered.y / scale) as f32,
            &FILTERED_MARKER,
        );
    }
}
