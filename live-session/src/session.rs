use live_net::metrics;
use serde::{Deserialize, Serialize};
use signaling::{SignalingClient, StartBroadcastRequest, StreamSession};
use tracing::{debug, info, warn};

use crate::error::SessionError;

/// Lifecycle of one outgoing broadcast. Driven by explicit calls, never by
/// UI hooks, so the machine is testable without a UI harness.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionState {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "starting")]
    Starting,
    #[serde(rename = "live")]
    Live,
    #[serde(rename = "stopping")]
    Stopping,
    #[serde(rename = "ended")]
    Ended,
    #[serde(rename = "error")]
    Error,
}

/// Owns at most one live session against the signaling gateway. The
/// controller is the sole writer of its state; callers take snapshot reads.
#[derive(Debug)]
pub struct BroadcasterController {
    gateway: SignalingClient,
    enabled: bool,
    state: SessionState,
    session: Option<StreamSession>,
    last_error: Option<String>,
    audio_muted: bool,
    video_hidden: bool,
}

impl BroadcasterController {
    pub fn new(gateway: SignalingClient, enabled: bool) -> Self {
        Self {
            gateway,
            enabled,
            state: SessionState::Idle,
            session: None,
            last_error: None,
            audio_muted: false,
            video_hidden: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&StreamSession> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Start a broadcast. A repeated call while already starting or live is
    /// a no-op: rapid taps must not issue a second gateway call or change
    /// the held session id.
    pub async fn request_start(
        &mut self,
        request: StartBroadcastRequest,
    ) -> Result<(), SessionError> {
        if !self.enabled {
            return Err(SessionError::FeatureDisabled);
        }
        if matches!(self.state, SessionState::Starting | SessionState::Live) {
            debug!(state = ?self.state, "start requested while already active; ignored");
            return Ok(());
        }

        self.state = SessionState::Starting;
        self.last_error = None;

        match self.gateway.start_broadcast(&request).await {
            Ok(session) => {
                info!(session_id = %session.session_id, room = %session.room_name, "broadcast live");
                metrics::session_metrics().on_session_started();
                self.session = Some(session);
                self.state = SessionState::Live;
                Ok(())
            }
            Err(err) => {
                metrics::session_metrics().on_start_failure();
                let reason = err.to_string();
                self.state = SessionState::Error;
                self.last_error = Some(reason.clone());
                Err(SessionError::StartFailed(reason))
            }
        }
    }

    /// Clear a start failure. The error is not sticky: acknowledging it
    /// returns the controller to `Idle` so a fresh start can be requested.
    pub fn acknowledge_error(&mut self) {
        if self.state == SessionState::Error {
            self.state = SessionState::Idle;
            self.last_error = None;
        }
    }

    /// Stop the broadcast. Best-effort: a failed stop call is logged, never
    /// surfaced, and the controller still ends locally — staying live after
    /// the user asked to leave is strictly worse than a possibly-orphaned
    /// remote session.
    pub async fn request_stop(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Live {
            debug!(state = ?self.state, "stop requested without a live session; ignored");
            return Ok(());
        }
        let Some(session) = self.session.take() else {
            self.state = SessionState::Ended;
            return Ok(());
        };

        self.state = SessionState::Stopping;
        if let Err(err) = self.gateway.stop_broadcast(&session.session_id).await {
            warn!(%err, session_id = %session.session_id, "stop call failed; ending session locally");
        }
        metrics::session_metrics().on_session_ended();
        self.state = SessionState::Ended;
        Ok(())
    }

    /// Local-only mute flag; no network effect.
    pub fn toggle_audio_muted(&mut self) -> bool {
        self.audio_muted = !self.audio_muted;
        self.audio_muted
    }

    /// Local-only video-hide flag; no network effect.
    pub fn toggle_video_hidden(&mut self) -> bool {
        self.video_hidden = !self.video_hidden;
        self.video_hidden
    }

    pub fn audio_muted(&self) -> bool {
        self.audio_muted
    }

    pub fn video_hidden(&self) -> bool {
        self.video_hidden
    }
}

impl Drop for BroadcasterController {
    /// Scope exit while live forces a stop: the call is dispatched
    /// immediately, without waiting for confirmation or UI involvement.
    fn drop(&mut self) {
        if self.state != SessionState::Live {
            return;
        }
        let Some(session) = self.session.take() else {
            return;
        };

        metrics::session_metrics().on_session_ended();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let gateway = self.gateway.clone();
                info!(session_id = %session.session_id, "controller dropped while live; forcing stop");
                handle.spawn(async move {
                    if let Err(err) = gateway.stop_broadcast(&session.session_id).await {
                        warn!(%err, session_id = %session.session_id, "forced stop failed");
                    }
                });
            }
            Err(_) => {
                warn!(session_id = %session.session_id, "dropped while live outside a runtime; remote session may be orphaned");
            }
        }
    }
}
