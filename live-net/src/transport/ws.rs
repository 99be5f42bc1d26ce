use std::fmt::Display;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    accept_async, connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};

use super::{RoomTransport, TransportError, TransportErrorKind, TransportKind};
use crate::message::{self, ClientEvent};

fn map_ws_error(err: impl Display) -> TransportError {
    TransportError::new(TransportErrorKind::Io, err.to_string())
}

fn map_encode_error(err: serde_json::Error) -> TransportError {
    TransportError::new(TransportErrorKind::EncodingFailure, err.to_string())
}

fn map_decode_error(err: serde_json::Error) -> TransportError {
    TransportError::new(TransportErrorKind::DecodingFailure, err.to_string())
}

/// Client-side transport over an outbound (possibly TLS) connection.
pub type WsClientTransport = WsTransport<MaybeTlsStream<TcpStream>>;

/// Websocket transport for one room channel. Events travel as JSON text
/// frames; binary frames are tolerated on receive.
#[derive(Debug)]
pub struct WsTransport<S> {
    stream: WebSocketStream<S>,
}

impl<S> WsTransport<S> {
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self { stream }
    }
}

impl WsTransport<MaybeTlsStream<TcpStream>> {
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (stream, _response) = connect_async(url).await.map_err(map_ws_error)?;
        Ok(Self::new(stream))
    }
}

impl WsTransport<TcpStream> {
    pub async fn accept(stream: TcpStream) -> Result<Self, TransportError> {
        let ws_stream = accept_async(stream).await.map_err(map_ws_error)?;
        Ok(Self::new(ws_stream))
    }
}

#[async_trait]
impl<S> RoomTransport for WsTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn kind(&self) -> TransportKind {
        TransportKind::WebSocket
    }

    async fn send_event(&mut self, event: ClientEvent) -> Result<(), TransportError> {
        let text = message::encode_client(&event).map_err(map_encode_error)?;
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(map_ws_error)
    }

    async fn recv_event(&mut self) -> Result<message::RoomEvent, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return message::decode_room(text.as_bytes()).map_err(map_decode_error);
                }
                Some(Ok(Message::Binary(bytes))) => {
                    return message::decode_room(&bytes).map_err(map_decode_error);
                }
                Some(Ok(Message::Ping(payload))) => {
                    self.stream
                        .send(Message::Pong(payload))
                        .await
                        .map_err(map_ws_error)?;
                }
                Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) => {
                    return Err(TransportError::new(
                        TransportErrorKind::ConnectionClosed,
                        "websocket closed",
                    ));
                }
                Some(Ok(other)) => {
                    return Err(TransportError::new(
                        TransportErrorKind::Unsupported,
                        format!("unsupported message: {other:?}"),
                    ));
                }
                Some(Err(err)) => return Err(map_ws_error(err)),
                None => {
                    return Err(TransportError::new(
                        TransportErrorKind::ConnectionClosed,
                        "websocket closed",
                    ));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream
            .close(None)
            .await
            .map_err(|err: WsError| map_ws_error(err))
    }
}
