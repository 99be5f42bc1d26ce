use std::collections::VecDeque;
use std::time::Duration;

use live_net::message::{room_key, ClientEvent, RoomEvent};
use live_net::metrics;
use live_net::transport::{
    ws::{WsClientTransport, WsTransport},
    RoomTransport, TransportError, TransportErrorKind,
};
use signaling::{SignalingClient, WatchInfo};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::SessionError;

/// Upper bound on the newest-first message log. Arrivals beyond the cap
/// evict from the back.
pub const MESSAGE_LOG_CAP: usize = 200;

/// Input-layer bound on one chat message, in characters.
pub const MAX_CHAT_LEN: usize = 1000;

/// One rendered chat line. `id` is the emission timestamp as text:
/// same-millisecond sends from different senders collide, and that is the
/// contract to preserve, not fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub ts: i64,
}

type ViewerChannel = WsClientTransport;

/// One mounted viewer: exactly one watch resolution and one room channel,
/// both scoped to this value's lifetime. Closing is unconditional on
/// teardown and never notifies the room.
#[derive(Debug)]
pub struct ViewerSession {
    stream_id: String,
    info: WatchInfo,
    channel: Option<ViewerChannel>,
    messages: VecDeque<ChatMessage>,
    viewer_count: u32,
}

impl ViewerSession {
    /// Resolve join credentials and open the room channel. Resolution
    /// happens exactly once; a failure is terminal for this mount and the
    /// caller retries by connecting again.
    pub async fn connect(
        gateway: &SignalingClient,
        stream_id: &str,
        enabled: bool,
        connect_timeout: Duration,
    ) -> Result<Self, SessionError> {
        if !enabled {
            return Err(SessionError::FeatureDisabled);
        }

        let info = gateway
            .watch(stream_id)
            .await
            .map_err(|err| SessionError::WatchResolutionFailed(err.to_string()))?;

        let url = format!(
            "{}/rooms/{}?token={}",
            info.url.trim_end_matches('/'),
            room_key(&info.room_name),
            info.token
        );
        let channel = timeout(connect_timeout, WsTransport::connect(&url))
            .await
            .map_err(|_| {
                TransportError::new(TransportErrorKind::Timeout, "channel connect timed out")
            })??;

        info!(%stream_id, room = %info.room_name, "viewer channel open");

        Ok(Self {
            stream_id: stream_id.to_string(),
            info,
            channel: Some(channel),
            messages: VecDeque::new(),
            viewer_count: 0,
        })
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn title(&self) -> Option<&str> {
        self.info.title.as_deref()
    }

    pub fn cover_url(&self) -> Option<&str> {
        self.info.cover_url.as_deref()
    }

    pub fn viewer_count(&self) -> u32 {
        self.viewer_count
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Newest-first message log. Display order is arrival order: the most
    /// recent arrival is always at the front regardless of its timestamp.
    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Receive and apply the next room event. Malformed frames are skipped
    /// silently; any other channel failure ends the stream (`None`) — there
    /// is no reconnection.
    pub async fn recv_event(&mut self) -> Option<RoomEvent> {
        loop {
            let channel = self.channel.as_mut()?;
            match channel.recv_event().await {
                Ok(event) => {
                    self.apply(&event);
                    return Some(event);
                }
                Err(err) if err.kind == TransportErrorKind::DecodingFailure => {
                    warn!(%err, "malformed room event skipped");
                }
                Err(err) => {
                    if err.is_closed() {
                        debug!(stream_id = %self.stream_id, "room channel closed");
                    } else {
                        warn!(%err, stream_id = %self.stream_id, "room channel error");
                    }
                    self.channel = None;
                    return None;
                }
            }
        }
    }

    fn apply(&mut self, event: &RoomEvent) {
        match event {
            RoomEvent::Chat { text, ts } => {
                metrics::channel_metrics().inc_chat_received();
                self.messages.push_front(ChatMessage {
                    id: ts.to_string(),
                    text: text.clone(),
                    ts: *ts,
                });
                while self.messages.len() > MESSAGE_LOG_CAP {
                    self.messages.pop_back();
                    metrics::channel_metrics().inc_chat_dropped();
                }
            }
            RoomEvent::Reaction { .. } => {
                metrics::channel_metrics().inc_reactions_received();
            }
            RoomEvent::Presence { viewers } => {
                self.viewer_count = *viewers;
            }
        }
    }

    /// Send a chat message. Empty-after-trim input is a no-op (`Ok(false)`)
    /// and the text is clamped to the input-layer bound. The sender's own
    /// message is not echoed into the local log; the channel does not fan
    /// it back to its emitter.
    pub async fn send_chat(&mut self, text: &str) -> Result<bool, SessionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }
        let text: String = trimmed.chars().take(MAX_CHAT_LEN).collect();

        let channel = self.channel.as_mut().ok_or_else(closed_channel)?;
        channel.send_event(ClientEvent::Chat { text }).await?;
        Ok(true)
    }

    /// Fire-and-forget reaction.
    pub async fn send_reaction(&mut self, emoji: &str) -> Result<(), SessionError> {
        let channel = self.channel.as_mut().ok_or_else(closed_channel)?;
        channel
            .send_event(ClientEvent::Reaction {
                emoji: emoji.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Close the channel. Runs unconditionally on unmount regardless of
    /// session status; no departure is announced to the room.
    pub async fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if let Err(err) = channel.close().await {
                debug!(%err, stream_id = %self.stream_id, "channel close failed");
            }
        }
    }
}

impl Drop for ViewerSession {
    /// Last-resort close for a session dropped without an explicit
    /// `close()`. Best-effort only.
    fn drop(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = channel.close().await;
                });
            }
        }
    }
}

fn closed_channel() -> SessionError {
    SessionError::Channel(TransportError::new(
        TransportErrorKind::ConnectionClosed,
        "channel closed",
    ))
}
