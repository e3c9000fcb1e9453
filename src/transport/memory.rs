//! In-process transport built from a pair of unbounded channels.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Sink, Stream};
use tokio::sync::mpsc;

use super::Frame;
use crate::error::HubError;

/// One end of an in-memory duplex link.
///
/// Frames sent into one end come out of the other, in order. Dropping an
/// end closes the link: the other end's stream terminates and its sends
/// fail with [`HubError::TransportClosed`].
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Frame>,
    rx: mpsc::UnboundedReceiver<Frame>,
}

impl ChannelTransport {
    /// Creates two connected ends.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self { tx: a_tx, rx: a_rx },
            Self { tx: b_tx, rx: b_rx },
        )
    }

    /// Sends a frame to the other end without going through `Sink`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::TransportClosed`] if the other end is gone.
    pub fn send_frame(&self, frame: Frame) -> Result<(), HubError> {
        self.tx.send(frame).map_err(|_| HubError::TransportClosed)
    }

    /// Receives the next frame from the other end, or `None` once it is gone.
    pub async fn recv_frame(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }
}

impl Stream for ChannelTransport {
    type Item = Result<Frame, HubError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx).map(|frame| frame.map(Ok))
    }
}

impl Sink<Frame> for ChannelTransport {
    type Error = HubError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if self.tx.is_closed() {
            Poll::Ready(Err(HubError::TransportClosed))
        } else {
            Poll::Ready(Ok(()))
        }
    }

    fn start_send(self: Pin<&mut Self>, item: Frame) -> Result<(), Self::Error> {
        self.tx.send(item).map_err(|_| HubError::TransportClosed)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};

    #[tokio::test]
    async fn frames_cross_in_order() {
        let (mut a, mut b) = ChannelTransport::pair();
        let sent = a.send(Frame::Text("one".to_string())).await;
        assert!(sent.is_ok());
        let sent = a.send(Frame::Ping(Vec::new())).await;
        assert!(sent.is_ok());

        assert_eq!(b.next().await, Some(Ok(Frame::Text("one".to_string()))));
        assert_eq!(b.recv_frame().await, Some(Frame::Ping(Vec::new())));
    }

    #[tokio::test]
    async fn dropping_one_end_closes_the_other() {
        let (a, mut b) = ChannelTransport::pair();
        drop(a);
        assert!(b.next().await.is_none());
        assert_eq!(
            b.send(Frame::Close).await,
            Err(HubError::TransportClosed)
        );
    }
}
