use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::analysis::ImageAnalyzer;
use crate::capture::{FingertipDetector, FrameSource};
use crate::config::DrawConfig;
use crate::db::DrawingStore;
use crate::session::loop_worker::{capture_loop, session_loop, SessionEvent, SessionMessage};
use crate::session::state::{DrawSession, UserAction};

const ENABLE_LOGS: bool = true;
use crate::log_info;

const FRAME_CHANNEL_CAPACITY: usize = 8;

/// Owns one session's capture thread and consumer task. The session's
/// canvas/detector live inside the consumer; nothing is shared across
/// sessions.
pub struct SessionController {
    session_id: String,
    actions: mpsc::Sender<SessionMessage>,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    cancel_token: CancellationToken,
    consumer: Option<JoinHandle<()>>,
    capture: Option<std::thread::JoinHandle<()>>,
}

impl SessionController {
    /// Validates the configuration (fail fast, per the error policy) and
    /// spawns the capture thread plus consumer task.
    pub fn start<F, D, S>(
        config: DrawConfig,
        source: F,
        detector: D,
        store: S,
        analyzer: Option<Arc<dyn ImageAnalyzer>>,
    ) -> Result<Self>
    where
        F: FrameSource,
        D: FingertipDetector,
        S: DrawingStore,
    {
        config.validate()?;

        let session = DrawSession::new(config);
        let session_id = session.id().to_string();

        let (message_tx, message_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();

        let capture_tx = message_tx.clone();
        let capture_token = cancel_token.clone();
        let capture = std::thread::Builder::new()
            .name("airsketch-capture".into())
            .spawn(move || capture_loop(source, detector, capture_tx, capture_token))
            .context("failed to spawn capture thread")?;

        let consumer = tokio::spawn(session_loop(
            session,
            store,
            analyzer,
            message_rx,
            event_tx,
            cancel_token.clone(),
        ));

        log_info!("session {session_id} started");

        Ok(Self {
            session_id,
            actions: message_tx,
            events: Some(event_rx),
            cancel_token,
            consumer: Some(consumer),
            capture: Some(capture),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Takes the event stream. Call once, right after `start`.
    pub fn events(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events.take()
    }

    /// Queues a user action behind any frames already in flight; actions are
    /// never dropped, the send waits for channel space.
    pub async fn send_action(&self, action: UserAction) -> Result<()> {
        self.actions
            .send(SessionMessage::Action(action))
            .await
            .map_err(|_| anyhow::anyhow!("session {} is no longer running", self.session_id))
    }

    /// Stops capture and waits for the consumer to finish. An in-flight save
    /// completes before the loop observes the cancellation; its result is
    /// discarded if the event receiver is already gone.
    pub async fn stop(&mut self) -> Result<()> {
        self.cancel_token.cancel();

        if let Some(handle) = self.consumer.take() {
            handle.await.context("session consumer task failed to join")?;
        }

        if let Some(handle) = self.capture.take() {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .context("capture thread join worker failed")?
                .map_err(|err| anyhow::anyhow!("capture thread panicked: {err:?}"))?;
        }

        log_info!("session {} stopped", self.session_id);
        Ok(())
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        // Best effort if the caller never awaited `stop`.
        self.cancel_token.cancel();
    }
}
