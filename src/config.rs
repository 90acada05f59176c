use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default pinch thresholds and stroke style.
pub const DEFAULT_MIN_PINCH_DISTANCE: f32 = 20.0;
pub const DEFAULT_MAX_PINCH_DISTANCE: f32 = 100.0;
pub const DEFAULT_LINE_THICKNESS: u32 = 5;
pub const DEFAULT_STROKE_COLOR: [u8; 3] = [255, 0, 0];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("min pinch distance ({min}) must not exceed max pinch distance ({max})")]
    InvertedPinchBand { min: f32, max: f32 },
    #[error("pinch distances must be non-negative (min: {min}, max: {max})")]
    NegativePinchDistance { min: f32, max: f32 },
    #[error("line thickness must be at least 1 pixel")]
    ZeroThickness,
}

/// Runtime configuration for one drawing session.
///
/// Validated once at startup; a detector never re-checks the band ordering
/// per frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DrawConfig {
    /// Fingertip distance (pixels) below which a pinch begins.
    pub min_pinch_distance: f32,
    /// Fingertip distance (pixels) above which a pinch ends. Distances in
    /// `[min, max]` fall into the hysteresis dead zone and change nothing.
    pub max_pinch_distance: f32,
    pub line_thickness: u32,
    pub stroke_color: [u8; 3],
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            min_pinch_distance: DEFAULT_MIN_PINCH_DISTANCE,
            max_pinch_distance: DEFAULT_MAX_PINCH_DISTANCE,
            line_thickness: DEFAULT_LINE_THICKNESS,
            stroke_color: DEFAULT_STROKE_COLOR,
        }
    }
}

impl DrawConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_pinch_distance < 0.0 || self.max_pinch_distance < 0.0 {
            return Err(ConfigError::NegativePinchDistance {
                min: self.min_pinch_distance,
                max: self.max_pinch_distance,
            });
        }
        if self.min_pinch_distance > self.max_pinch_distance {
            return Err(ConfigError::InvertedPinchBand {
                min: self.min_pinch_distance,
                max: self.max_pinch_distance,
            });
        }
        if self.line_thickness < 1 {
            return Err(ConfigError::ZeroThickness);
        }
        Ok(())
    }
}
