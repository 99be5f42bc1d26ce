use async_trait::async_trait;
use thiserror::Error;

use crate::message::{ClientEvent, RoomEvent};

pub mod ws;

pub use ws::WsTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    WebSocket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Io,
    EncodingFailure,
    DecodingFailure,
    ConnectionClosed,
    Timeout,
    Unsupported,
}

#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.kind == TransportErrorKind::ConnectionClosed
    }
}

/// One bidirectional room-scoped connection. Implementations own the
/// underlying socket; callers get exactly-once close semantics and no
/// delivery guarantee beyond arrival order.
#[async_trait]
pub trait RoomTransport: Send {
    fn kind(&self) -> TransportKind;

    /// Emit one event into the room. Fire-and-forget: no acknowledgment
    /// is awaited beyond the socket write.
    async fn send_event(&mut self, event: ClientEvent) -> Result<(), TransportError>;

    /// Receive the next room event in arrival order. A decode failure is
    /// returned as `DecodingFailure` so the caller can skip the frame.
    async fn recv_event(&mut self) -> Result<RoomEvent, TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}
