//! Transport layer: framed bidirectional streams the pumps run on.
//!
//! A transport is anything that is both a [`Stream`] of inbound
//! [`Frame`]s and a [`Sink`] of outbound ones, with [`HubError`] as the
//! error type. The pumps split it into a read half (inbound loop) and a
//! write half (outbound loop), so the outbound loop is its only writer.
//!
//! Two implementations ship with the crate:
//!
//! - [`axum_ws::WsTransport`] wraps an upgraded Axum WebSocket.
//! - [`memory::ChannelTransport`] is an in-process pair for tests and
//!   embedding.

pub mod axum_ws;
pub mod memory;

use futures_util::{Sink, Stream};

use crate::error::HubError;

pub use axum_ws::WsTransport;
pub use memory::ChannelTransport;

/// A single discrete frame. Probe frames are distinguished by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 data frame.
    Text(String),
    /// Binary data frame.
    Binary(Vec<u8>),
    /// Liveness probe.
    Ping(Vec<u8>),
    /// Liveness probe response.
    Pong(Vec<u8>),
    /// Graceful close.
    Close,
}

impl Frame {
    /// Returns the payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) | Self::Ping(bytes) | Self::Pong(bytes) => bytes.len(),
            Self::Close => 0,
        }
    }

    /// Returns `true` if the frame carries no payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A framed, bidirectional, connection-oriented stream.
///
/// Blanket-implemented for every type with the right `Stream` and `Sink`
/// shape; there is nothing to implement by hand.
pub trait Transport:
    Stream<Item = Result<Frame, HubError>> + Sink<Frame, Error = HubError> + Send + Unpin + 'static
{
}

impl<T> Transport for T where
    T: Stream<Item = Result<Frame, HubError>>
        + Sink<Frame, Error = HubError>
        + Send
        + Unpin
        + 'static
{
}
