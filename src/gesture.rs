//! Pinch detection with a hysteresis band.
//!
//! Distances below `min_pinch_distance` mean "pen down", above
//! `max_pinch_distance` mean "pen up". The band in between is a dead zone:
//! jitter around a single threshold would otherwise toggle the pinch every
//! frame and shred strokes into confetti.

use serde::{Deserialize, Serialize};

use crate::capture::{FingertipSample, Point};
use crate::config::DrawConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PinchPhase {
    Released,
    Pinching,
}

/// One frame's classification of the fingertip pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PinchEvent {
    /// Pinch just closed; `0` is the index-tip position starting the stroke.
    Start(Point),
    /// Pinch held across consecutive frames; draw `from` → `to`.
    Continue { from: Point, to: Point },
    /// Pinch opened past the release threshold.
    End,
    /// Dropped frame, dead-zone distance, or already-released hand.
    Idle,
}

/// Tracks the pinch phase and the last index-tip position across frames.
/// Exclusive owner of that state; a canvas clear must call [`reset`].
///
/// [`reset`]: PinchDetector::reset
#[derive(Debug)]
pub struct PinchDetector {
    min_distance: f32,
    max_distance: f32,
    phase: PinchPhase,
    last_index: Option<Point>,
}

impl PinchDetector {
    /// Thresholds come from an already-validated [`DrawConfig`]; the band
    /// ordering is not re-checked here.
    pub fn new(config: &DrawConfig) -> Self {
        Self {
            min_distance: config.min_pinch_distance,
            max_distance: config.max_pinch_distance,
            phase: PinchPhase::Released,
            last_index: None,
        }
    }

    pub fn phase(&self) -> PinchPhase {
        self.phase
    }

    pub fn update(&mut self, sample: &FingertipSample) -> PinchEvent {
        let (Some(thumb), Some(index)) = (sample.thumb, sample.index) else {
            // Dropped frame: hold state so a momentary tracking loss does not
            // end the stroke.
            return PinchEvent::Idle;
        };

        let distance = thumb.distance_to(&index);

        if distance < self.min_distance {
            match self.phase {
                PinchPhase::Released => {
                    self.phase = PinchPhase::Pinching;
                    self.last_index = Some(index);
                    PinchEvent::Start(index)
                }
                PinchPhase::Pinching => {
                    let from = self.last_index.unwrap_or(index);
                    self.last_index = Some(index);
                    PinchEvent::Continue { from, to: index }
                }
            }
        } else if distance > self.max_distance {
            let was_pinching = self.phase == PinchPhase::Pinching;
            self.phase = PinchPhase::Released;
            self.last_index = None;
            if was_pinching {
                PinchEvent::End
            } else {
                PinchEvent::Idle
            }
        } else {
            // Hysteresis dead zone.
            PinchEvent::Idle
        }
    }

    pub fn reset(&mut self) {
        self.phase = PinchPhase::Released;
        self.last_index = None;
    }
}
