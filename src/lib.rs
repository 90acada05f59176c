//! Pinch-gesture drawing engine.
//!
//! Turns a noisy per-frame stream of thumb/index fingertip positions into a
//! persistent raster drawing: a hysteresis pinch detector classifies each
//! frame, a stroke compositor accumulates line segments on the canvas, and a
//! session state machine arbitrates clear/save/history against the frame
//! stream. Saving snapshots the canvas as PNG, asks an optional vision
//! analyzer for commentary, and appends the record to SQLite.
//!
//! Cameras, hand-landmark models and the remote analysis service are
//! external collaborators behind the [`capture::FrameSource`],
//! [`capture::FingertipDetector`] and [`analysis::ImageAnalyzer`] traits.

pub mod analysis;
pub mod canvas;
pub mod capture;
pub mod config;
pub mod db;
pub mod gesture;
pub mod models;
pub mod session;
pub mod settings;
mod utils;

pub use analysis::{AnalysisError, ImageAnalyzer, ANALYSIS_PROMPT};
pub use canvas::Canvas;
pub use capture::{FingertipDetector, FingertipSample, FrameSource, Point};
pub use config::{ConfigError, DrawConfig};
pub use db::{Database, DrawingStore};
pub use models::{DrawingRecord, NewDrawing, SavedDrawing};
pub use session::{
    DrawSession, SaveError, SessionController, SessionEvent, SessionMode, UserAction,
};
pub use settings::SettingsStore;
