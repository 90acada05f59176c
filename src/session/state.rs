use image::RgbImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::{composite, mark_fingertips, Canvas};
use crate::capture::FingertipSample;
use crate::config::DrawConfig;
use crate::gesture::{PinchDetector, PinchPhase};
use crate::models::SavedDrawing;
use crate::session::save::SaveError;

/// Which inputs the session currently accepts. One transition function
/// instead of a pile of ad hoc booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionMode {
    /// Frames flow through the detector and compositor each tick.
    Live,
    /// A save is in flight; frame input is ignored so no stroke races the
    /// snapshot being persisted.
    Saving,
    /// Browsing persisted drawings; only `Clear` leads back to `Live`.
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserAction {
    Clear,
    Save,
    ViewHistory,
}

/// What the presentation layer receives each live tick.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub composited_frame: RgbImage,
    pub mode: SessionMode,
    pub pending_analysis: Option<String>,
}

/// Result of feeding a user action into the state machine.
#[derive(Debug)]
pub enum ActionOutcome {
    Cleared,
    /// Transitioned to `Saving`; the snapshot goes to the save orchestrator.
    SaveStarted(Canvas),
    HistoryOpened,
    /// The action is not valid in the current mode (or there is nothing to
    /// save yet). Nothing fired.
    Rejected(UserAction),
}

/// One session's exclusively-owned drawing state: canvas, pinch detector and
/// the last save's analysis text. Drives the per-frame pipeline for the
/// single-threaded cooperative shape; the channel-based controller wraps the
/// same struct.
pub struct DrawSession {
    id: String,
    config: DrawConfig,
    mode: SessionMode,
    detector: PinchDetector,
    canvas: Option<Canvas>,
    pending_analysis: Option<String>,
}

impl DrawSession {
    /// `config` must already be validated; see [`DrawConfig::validate`].
    pub fn new(config: DrawConfig) -> Self {
        let detector = PinchDetector::new(&config);
        Self {
            id: Uuid::new_v4().to_string(),
            config,
            mode: SessionMode::Live,
            detector,
            canvas: None,
            pending_analysis: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    pub fn pending_analysis(&self) -> Option<&str> {
        self.pending_analysis.as_deref()
    }

    /// Runs one tick of the detector→compositor pipeline and produces the
    /// display output. Returns `None` outside `Live`: frames arriving during
    /// `Saving` or `History` neither mutate state nor refresh the display.
    pub fn process_frame(
        &mut self,
        frame: &RgbImage,
        sample: &FingertipSample,
    ) -> Option<TickOutput> {
        if self.mode != SessionMode::Live {
            return None;
        }

        // Canvas dimensions come from the first frame and stay fixed.
        let canvas = self
            .canvas
            .get_or_insert_with(|| Canvas::new(frame.width(), frame.height()));

        let event = self.detector.update(sample);
        canvas.apply(&event, self.config.stroke_color, self.config.line_thickness);

        let mut display = composite(frame, canvas);
        if self.detector.phase() == PinchPhase::Pinching {
            if let (Some(thumb), Some(index)) = (sample.thumb, sample.index) {
                mark_fingertips(&mut display, thumb, index);
            }
        }

        Some(TickOutput {
            composited_frame: display,
            mode: self.mode,
            pending_analysis: self.pending_analysis.clone(),
        })
    }

    /// Exactly one action is accepted at a time; invalid ones are rejected
    /// without side effects.
    pub fn handle_action(&mut self, action: UserAction) -> ActionOutcome {
        match (self.mode, action) {
            // Clear is valid in any mode and always lands back in Live.
            (_, UserAction::Clear) => {
                if let Some(canvas) = self.canvas.as_mut() {
                    canvas.clear();
                }
                self.detector.reset();
                self.pending_analysis = None;
                self.mode = SessionMode::Live;
                ActionOutcome::Cleared
            }
            (SessionMode::Live, UserAction::Save) => match self.canvas.clone() {
                Some(snapshot) => {
                    self.mode = SessionMode::Saving;
                    ActionOutcome::SaveStarted(snapshot)
                }
                // No frame has arrived yet, so there is nothing to persist.
                None => ActionOutcome::Rejected(UserAction::Save),
            },
            (SessionMode::Live, UserAction::ViewHistory) => {
                self.mode = SessionMode::History;
                ActionOutcome::HistoryOpened
            }
            (_, action) => ActionOutcome::Rejected(action),
        }
    }

    /// Completes a save attempt started by [`handle_action`]. Success or
    /// failure, the session returns to `Live`.
    ///
    /// [`handle_action`]: DrawSession::handle_action
    pub fn finish_save(&mut self, result: &Result<SavedDrawing, SaveError>) {
        debug_assert_eq!(self.mode, SessionMode::Saving);
        if let Ok(saved) = result {
            self.pending_analysis = saved.analysis.clone();
        }
        self.mode = SessionMode::Live;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Point;
    use chrono::Utc;

    fn session() -> DrawSession {
        DrawSession::new(DrawConfig::default())
    }

    fn blank_frame() -> RgbImage {
        RgbImage::new(160, 120)
    }

    fn sample_at_distance(distance: i32, x: i32, y: i32) -> FingertipSample {
        FingertipSample::present(Point::new(x + distance, y), Point::new(x, y))
    }

    fn saved(analysis: Option<&str>) -> SavedDrawing {
        SavedDrawing {
            id: 1,
            analysis: analysis.map(str::to_string),
            analysis_warning: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pinch_run_draws_exactly_the_expected_segments() {
        // Distances 15,15,15,150 against the 20/100 band: Start, Continue,
        // Continue, End — two drawn segments.
        let mut session = session();
        let frame = blank_frame();

        session.process_frame(&frame, &sample_at_distance(15, 10, 10));
        session.process_frame(&frame, &sample_at_distance(15, 30, 10));
        session.process_frame(&frame, &sample_at_distance(15, 50, 10));
        session.process_frame(&frame, &sample_at_distance(150, 50, 10));

        let mut expected = Canvas::new(160, 120);
        expected.draw_segment(Point::new(10, 10), Point::new(30, 10), [255, 0, 0], 5);
        expected.draw_segment(Point::new(30, 10), Point::new(50, 10), [255, 0, 0], 5);

        assert_eq!(
            session.canvas().unwrap().image().as_raw(),
            expected.image().as_raw()
        );
    }

    #[test]
    fn canvas_adopts_first_frame_dimensions() {
        let mut session = session();
        session.process_frame(&RgbImage::new(320, 240), &FingertipSample::absent());
        let canvas = session.canvas().unwrap();
        assert_eq!((canvas.width(), canvas.height()), (320, 240));
    }

    #[test]
    fn feedback_circles_appear_only_while_pinching() {
        let mut session = session();
        let frame = blank_frame();

        let idle = session
            .process_frame(&frame, &sample_at_distance(150, 80, 60))
            .unwrap();
        assert_ne!(idle.composited_frame.get_pixel(80, 60).0, [0, 255, 0]);

        let pinching = session
            .process_frame(&frame, &sample_at_distance(10, 80, 60))
            .unwrap();
        assert_eq!(pinching.composited_frame.get_pixel(80, 60).0, [0, 255, 0]);
    }

    #[test]
    fn save_freezes_frames_until_finished() {
        let mut session = session();
        let frame = blank_frame();
        session.process_frame(&frame, &FingertipSample::absent());

        assert!(matches!(
            session.handle_action(UserAction::Save),
            ActionOutcome::SaveStarted(_)
        ));
        assert_eq!(session.mode(), SessionMode::Saving);

        // Frames during Saving are ignored entirely.
        assert!(session
            .process_frame(&frame, &sample_at_distance(10, 20, 20))
            .is_none());
        assert_eq!(session.canvas().unwrap().painted_pixel_count(), 0);

        session.finish_save(&Ok(saved(Some("two dots"))));
        assert_eq!(session.mode(), SessionMode::Live);
        assert_eq!(session.pending_analysis(), Some("two dots"));
    }

    #[test]
    fn save_is_rejected_while_saving_or_in_history() {
        let mut session = session();
        session.process_frame(&blank_frame(), &FingertipSample::absent());

        session.handle_action(UserAction::Save);
        assert!(matches!(
            session.handle_action(UserAction::Save),
            ActionOutcome::Rejected(UserAction::Save)
        ));
        assert!(matches!(
            session.handle_action(UserAction::ViewHistory),
            ActionOutcome::Rejected(UserAction::ViewHistory)
        ));

        session.finish_save(&Ok(saved(None)));
        session.handle_action(UserAction::ViewHistory);
        assert_eq!(session.mode(), SessionMode::History);
        assert!(matches!(
            session.handle_action(UserAction::Save),
            ActionOutcome::Rejected(UserAction::Save)
        ));
    }

    #[test]
    fn save_before_first_frame_is_rejected() {
        let mut session = session();
        assert!(matches!(
            session.handle_action(UserAction::Save),
            ActionOutcome::Rejected(UserAction::Save)
        ));
        assert_eq!(session.mode(), SessionMode::Live);
    }

    #[test]
    fn only_clear_exits_history() {
        let mut session = session();
        session.process_frame(&blank_frame(), &FingertipSample::absent());
        session.handle_action(UserAction::ViewHistory);

        assert!(session
            .process_frame(&blank_frame(), &sample_at_distance(10, 20, 20))
            .is_none());

        session.handle_action(UserAction::Clear);
        assert_eq!(session.mode(), SessionMode::Live);
    }

    #[test]
    fn clear_twice_matches_clear_once() {
        let mut session = session();
        let frame = blank_frame();
        session.process_frame(&frame, &sample_at_distance(10, 20, 20));
        session.process_frame(&frame, &sample_at_distance(10, 40, 20));
        assert!(session.canvas().unwrap().painted_pixel_count() > 0);

        session.handle_action(UserAction::Clear);
        let once = session.canvas().unwrap().image().as_raw().clone();

        session.handle_action(UserAction::Clear);
        assert_eq!(session.canvas().unwrap().image().as_raw(), &once);
        assert_eq!(session.canvas().unwrap().painted_pixel_count(), 0);

        // Detector was reset too: next pinch starts a fresh stroke instead of
        // continuing from a stale point.
        session.process_frame(&frame, &sample_at_distance(10, 90, 90));
        assert_eq!(session.canvas().unwrap().painted_pixel_count(), 0);
    }

    #[test]
    fn failed_save_returns_to_live_without_analysis() {
        let mut session = session();
        session.process_frame(&blank_frame(), &FingertipSample::absent());
        session.handle_action(UserAction::Save);

        let failure = Err(SaveError::Persist(anyhow::anyhow!("disk full")));
        session.finish_save(&failure);
        assert_eq!(session.mode(), SessionMode::Live);
        assert!(session.pending_analysis().is_none());
    }
}
