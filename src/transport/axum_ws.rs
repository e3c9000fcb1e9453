//! Adapter from an upgraded Axum [`WebSocket`] to a [`Transport`](super::Transport).

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, Stream};

use super::Frame;
use crate::error::HubError;

/// An upgraded WebSocket speaking [`Frame`]s.
///
/// Text and binary messages map to data frames, ping and pong to probe
/// frames, close to [`Frame::Close`]. Pong replies to the peer's own pings
/// are queued by the WebSocket implementation and flushed with the next
/// outbound write.
#[derive(Debug)]
pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    /// Wraps an upgraded socket.
    #[must_use]
    pub const fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

impl From<Message> for Frame {
    fn from(msg: Message) -> Self {
        match msg {
            Message::Text(text) => Self::Text(text.as_str().to_owned()),
            Message::Binary(bytes) => Self::Binary(bytes.to_vec()),
            Message::Ping(bytes) => Self::Ping(bytes.to_vec()),
            Message::Pong(bytes) => Self::Pong(bytes.to_vec()),
            Message::Close(_) => Self::Close,
        }
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Self::text(text),
            Frame::Binary(bytes) => Self::Binary(Bytes::from(bytes)),
            Frame::Ping(bytes) => Self::Ping(Bytes::from(bytes)),
            Frame::Pong(bytes) => Self::Pong(Bytes::from(bytes)),
            Frame::Close => Self::Close(None),
        }
    }
}

impl Stream for WsTransport {
    type Item = Result<Frame, HubError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.socket)
            .poll_next(cx)
            .map(|msg| msg.map(|res| res.map(Frame::from).map_err(HubError::from)))
    }
}

impl Sink<Frame> for WsTransport {
    type Error = HubError;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.socket)
            .poll_ready(cx)
            .map_err(HubError::from)
    }

    fn start_send(mut self: Pin<&mut Self>, item: Frame) -> Result<(), Self::Error> {
        Pin::new(&mut self.socket)
            .start_send(Message::from(item))
            .map_err(HubError::from)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.socket)
            .poll_flush(cx)
            .map_err(HubError::from)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.socket)
            .poll_close(cx)
            .map_err(HubError::from)
    }
}
