//! Boundary to the frame/fingertip acquisition collaborators.
//!
//! The engine never talks to a camera or a hand-landmark model directly; it
//! consumes an [`RgbImage`] per tick from a [`FrameSource`] and two fingertip
//! positions from a [`FingertipDetector`]. Both run on the dedicated capture
//! thread owned by the session controller.

use anyhow::Result;
use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// A position in frame-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One frame's worth of fingertip positions. Absent points mean the detector
/// found no hand this frame; the pinch detector treats that as a dropped
/// frame and keeps its state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingertipSample {
    pub thumb: Option<Point>,
    pub index: Option<Point>,
    pub captured_at: DateTime<Utc>,
}

impl FingertipSample {
    pub fn present(thumb: Point, index: Point) -> Self {
        Self {
            thumb: Some(thumb),
            index: Some(index),
            captured_at: Utc::now(),
        }
    }

    pub fn absent() -> Self {
        Self {
            thumb: None,
            index: None,
            captured_at: Utc::now(),
        }
    }
}

/// Produces raw frames. `Ok(None)` means the stream has ended (camera
/// unplugged, client disconnected); the session shuts down cleanly.
/// `Err` is a transient read failure, logged and skipped by the capture loop
/// up to a bounded number of consecutive occurrences.
pub trait FrameSource: Send + 'static {
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Finds thumb-tip and index-tip positions in a frame, or nothing when no
/// hand is visible. Wraps the external hand-landmark model.
pub trait FingertipDetector: Send + 'static {
    fn detect(&self, frame: &RgbImage) -> Option<(Point, Point)>;
}

/// Replays a fixed list of samples over a blank frame of fixed dimensions.
/// Stands in for the webcam+landmark pair in tests and the demo binary.
pub struct ScriptedCapture {
    width: u32,
    height: u32,
    samples: std::vec::IntoIter<FingertipSample>,
}

impl ScriptedCapture {
    pub fn new(width: u32, height: u32, samples: Vec<FingertipSample>) -> Self {
        Self {
            width,
            height,
            samples: samples.into_iter(),
        }
    }

    /// Pull the next scripted sample together with a blank frame, or `None`
    /// once the script is exhausted.
    pub fn next(&mut self) -> Option<(RgbImage, FingertipSample)> {
        let sample = self.samples.next()?;
        Some((RgbImage::new(self.width, self.height), sample))
    }
}

/// [`FrameSource`] yielding a fixed number of blank frames, then stream end.
pub struct ScriptedFrames {
    width: u32,
    height: u32,
    remaining: usize,
}

impl ScriptedFrames {
    pub fn new(width: u32, height: u32, count: usize) -> Self {
        Self {
            width,
            height,
            remaining: count,
        }
    }
}

impl FrameSource for ScriptedFrames {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(RgbImage::new(self.width, self.height)))
    }
}

/// [`FingertipDetector`] replaying scripted positions, one per `detect`
/// call; repeats its last entry once the script runs out.
pub struct ScriptedFingertips {
    script: std::sync::Mutex<std::collections::VecDeque<Option<(Point, Point)>>>,
    last: std::sync::Mutex<Option<(Point, Point)>>,
}

impl ScriptedFingertips {
    pub fn new(script: Vec<Option<(Point, Point)>>) -> Self {
        Self {
            script: std::sync::Mutex::new(script.into()),
            last: std::sync::Mutex::new(None),
        }
    }
}

impl FingertipDetector for ScriptedFingertips {
    fn detect(&self, _frame: &RgbImage) -> Option<(Point, Point)> {
        match self.script.lock().unwrap().pop_front() {
            Some(entry) => {
                *self.last.lock().unwrap() = entry;
                entry
            }
            None => *self.last.lock().unwrap(),
        }
    }
}
