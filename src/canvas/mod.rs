//! The persistent raster canvas and display compositing.
//!
//! The canvas is a plain pixel accumulator: strokes are burned in as line
//! segments and there is no stroke object model, so drawing is irreversible
//! short of a full clear. Dimensions are fixed at creation (from the first
//! camera frame) and only an explicit clear re-zeroes the buffer.

use anyhow::{Context, Result};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};

use crate::capture::Point;
use crate::gesture::PinchEvent;

/// Display blend weights, applied per channel with saturation:
/// `0.7 * frame + 0.8 * canvas`.
pub const FRAME_WEIGHT: f32 = 0.7;
pub const CANVAS_WEIGHT: f32 = 0.8;

/// Radius of the filled fingertip feedback circles drawn while pinching.
const FEEDBACK_RADIUS: i32 = 15;
const FEEDBACK_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    /// All-zero (black) canvas, same dimensions as the video frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgb([0, 0, 0]);
        }
    }

    /// Extends the canvas according to a pinch event. Only `Continue` draws;
    /// a `Start` is a single point with no segment yet and `End`/`Idle` leave
    /// the buffer untouched.
    pub fn apply(&mut self, event: &PinchEvent, color: [u8; 3], thickness: u32) {
        if let PinchEvent::Continue { from, to } = event {
            self.draw_segment(*from, *to, color, thickness);
        }
    }

    /// Straight segment from `from` to `to`: a Bresenham walk stamping a
    /// filled disc of radius `thickness / 2` at every step.
    pub fn draw_segment(&mut self, from: Point, to: Point, color: [u8; 3], thickness: u32) {
        let radius = (thickness / 2) as i32;
        let color = Rgb(color);

        let mut x = from.x;
        let mut y = from.y;
        let dx = (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.stamp_disc(x, y, radius, color);
            if x == to.x && y == to.y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn stamp_disc(&mut self, cx: i32, cy: i32, radius: i32, color: Rgb<u8>) {
        fill_disc(&mut self.image, cx, cy, radius, color);
    }

    /// Lossless PNG snapshot of the canvas.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(
                self.image.as_raw(),
                self.image.width(),
                self.image.height(),
                ExtendedColorType::Rgb8,
            )
            .context("failed to encode canvas as PNG")?;
        Ok(bytes)
    }

    /// Count of pixels touched by strokes. Test/debug helper.
    pub fn painted_pixel_count(&self) -> usize {
        self.image
            .pixels()
            .filter(|pixel| pixel.0 != [0, 0, 0])
            .count()
    }
}

/// Weighted additive blend of the live frame and the canvas for display,
/// saturating per channel.
pub fn composite(frame: &RgbImage, canvas: &Canvas) -> RgbImage {
    let mut out = frame.clone();
    for (dst, src) in out.pixels_mut().zip(canvas.image.pixels()) {
        for channel in 0..3 {
            let blended =
                FRAME_WEIGHT * dst.0[channel] as f32 + CANVAS_WEIGHT * src.0[channel] as f32;
            dst.0[channel] = blended.round().min(255.0) as u8;
        }
    }
    out
}

/// Filled green circles at the fingertip positions, drawn on the display
/// image (never the canvas) while a pinch is active.
pub fn mark_fingertips(display: &mut RgbImage, thumb: Point, index: Point) {
    fill_disc(display, thumb.x, thumb.y, FEEDBACK_RADIUS, FEEDBACK_COLOR);
    fill_disc(display, index.x, index.y, FEEDBACK_RADIUS, FEEDBACK_COLOR);
}

fn fill_disc(image: &mut RgbImage, cx: i32, cy: i32, radius: i32, color: Rgb<u8>) {
    let (width, height) = (image.width() as i32, image.height() as i32);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let (px, py) = (cx + dx, cy + dy);
            if px >= 0 && px < width && py >= 0 && py < height {
                image.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}
