//! The two halves of the producer/consumer runtime shape: a dedicated
//! capture thread turning the frame source into messages, and the consumer
//! task running the per-frame pipeline plus user actions on one channel.

use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::analysis::ImageAnalyzer;
use crate::capture::{FingertipDetector, FingertipSample, FrameSource};
use crate::db::DrawingStore;
use crate::models::{DrawingRecord, SavedDrawing};
use crate::session::save::save_drawing;
use crate::session::state::{ActionOutcome, DrawSession, SessionMode, TickOutput, UserAction};

const ENABLE_LOGS: bool = true;
use crate::{log_error, log_info, log_warn};

/// Capture pacing, ~30 fps.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Transient frame-read failures are skipped; this many in a row end the
/// session instead of retrying forever.
pub const MAX_CONSECUTIVE_CAPTURE_FAILURES: u32 = 30;

/// Everything the consumer reacts to, frames and user actions interleaved on
/// one channel so mode arbitration needs no locks.
pub enum SessionMessage {
    Frame {
        image: RgbImage,
        sample: FingertipSample,
    },
    Action(UserAction),
}

/// Outbound notifications for the presentation layer.
#[derive(Debug)]
pub enum SessionEvent {
    Tick(TickOutput),
    ModeChanged(SessionMode),
    DrawingSaved(SavedDrawing),
    SaveFailed { message: String },
    History(Vec<DrawingRecord>),
    HistoryFailed { message: String },
    Closed,
}

/// Runs on its own thread: paces the frame source, runs fingertip detection,
/// and pushes frame messages. A full channel drops the frame (the consumer is
/// busy, typically persisting a save); actions are never sent through here.
pub(super) fn capture_loop<F, D>(
    mut source: F,
    detector: D,
    frames: mpsc::Sender<SessionMessage>,
    cancel_token: CancellationToken,
) where
    F: FrameSource,
    D: FingertipDetector,
{
    let mut consecutive_failures: u32 = 0;

    while !cancel_token.is_cancelled() {
        match source.next_frame() {
            Ok(Some(image)) => {
                consecutive_failures = 0;
                let sample = match detector.detect(&image) {
                    Some((thumb, index)) => FingertipSample::present(thumb, index),
                    None => FingertipSample::absent(),
                };

                match frames.try_send(SessionMessage::Frame { image, sample }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        // Consumer is behind; dropping is the backpressure
                        // policy, the next frame supersedes this one anyway.
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }
            Ok(None) => {
                log_info!("frame stream ended, closing capture");
                break;
            }
            Err(err) => {
                consecutive_failures += 1;
                log_warn!(
                    "frame read failed ({consecutive_failures}/{MAX_CONSECUTIVE_CAPTURE_FAILURES}), skipping: {err:#}"
                );
                if consecutive_failures >= MAX_CONSECUTIVE_CAPTURE_FAILURES {
                    log_error!("too many consecutive capture failures, ending session");
                    break;
                }
            }
        }

        std::thread::sleep(FRAME_INTERVAL);
    }

    // Capture ending ends the session; an in-flight save still completes.
    cancel_token.cancel();
}

/// The consumer: one message at a time, in arrival order. A save runs inline,
/// which pins the session in `Saving` and is the only backpressure point.
pub(super) async fn session_loop<S: DrawingStore>(
    mut session: DrawSession,
    store: S,
    analyzer: Option<Arc<dyn ImageAnalyzer>>,
    mut messages: mpsc::Receiver<SessionMessage>,
    events: mpsc::UnboundedSender<SessionEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            message = messages.recv() => match message {
                Some(message) => message,
                None => break,
            },
            _ = cancel_token.cancelled() => {
                log_info!("session {} shutting down", session.id());
                break;
            }
        };

        match message {
            SessionMessage::Frame { image, sample } => {
                if let Some(tick) = session.process_frame(&image, &sample) {
                    let _ = events.send(SessionEvent::Tick(tick));
                }
            }
            SessionMessage::Action(action) => {
                handle_action(&mut session, action, &store, analyzer.clone(), &events).await;
            }
        }
    }

    let _ = events.send(SessionEvent::Closed);
}

async fn handle_action<S: DrawingStore>(
    session: &mut DrawSession,
    action: UserAction,
    store: &S,
    analyzer: Option<Arc<dyn ImageAnalyzer>>,
    events: &mpsc::UnboundedSender<SessionEvent>,
) {
    match session.handle_action(action) {
        ActionOutcome::Cleared => {
            let _ = events.send(SessionEvent::ModeChanged(SessionMode::Live));
        }
        ActionOutcome::SaveStarted(snapshot) => {
            let _ = events.send(SessionEvent::ModeChanged(SessionMode::Saving));

            let result = save_drawing(&snapshot, analyzer, store).await;
            session.finish_save(&result);

            match result {
                Ok(saved) => {
                    let _ = events.send(SessionEvent::DrawingSaved(saved));
                }
                Err(err) => {
                    log_error!("save failed for session {}: {err:#}", session.id());
                    let _ = events.send(SessionEvent::SaveFailed {
                        message: format!("{err:#}"),
                    });
                }
            }
            let _ = events.send(SessionEvent::ModeChanged(SessionMode::Live));
        }
        ActionOutcome::HistoryOpened => {
            let _ = events.send(SessionEvent::ModeChanged(SessionMode::History));
            match store.list().await {
                Ok(records) => {
                    let _ = events.send(SessionEvent::History(records));
                }
                Err(err) => {
                    log_error!("history listing failed: {err:#}");
                    let _ = events.send(SessionEvent::HistoryFailed {
                        message: format!("{err:#}"),
                    });
                }
            }
        }
        ActionOutcome::Rejected(action) => {
            log_warn!(
                "ignoring {action:?} in {:?} mode for session {}",
                session.mode(),
                session.id()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    struct BrokenSource;

    impl FrameSource for BrokenSource {
        fn next_frame(&mut self) -> anyhow::Result<Option<RgbImage>> {
            bail!("decode error")
        }
    }

    struct EndedSource;

    impl FrameSource for EndedSource {
        fn next_frame(&mut self) -> anyhow::Result<Option<RgbImage>> {
            Ok(None)
        }
    }

    struct NoHands;

    impl FingertipDetector for NoHands {
        fn detect(&self, _frame: &RgbImage) -> Option<(crate::capture::Point, crate::capture::Point)> {
            None
        }
    }

    #[test]
    fn repeated_read_failures_end_capture_after_the_bound() {
        let (tx, mut rx) = mpsc::channel(4);
        let token = CancellationToken::new();

        capture_loop(BrokenSource, NoHands, tx, token.clone());

        assert!(token.is_cancelled());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stream_end_cancels_immediately() {
        let (tx, mut rx) = mpsc::channel(4);
        let token = CancellationToken::new();

        capture_loop(EndedSource, NoHands, tx, token.clone());

        assert!(token.is_cancelled());
        assert!(rx.try_recv().is_err());
    }
}
