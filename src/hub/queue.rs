//! Per-connection outbound queue.
//!
//! The hub hands out [`OutboundQueue`] sender handles; the connection's
//! outbound loop owns the single [`OutboundReceiver`]. Items are frames
//! that have already been encoded.
//!
//! A capacity of `0` is emulated as a one-slot channel plus a handoff
//! signal, so a blocking push only completes once the outbound loop has
//! actually taken the frame.

use tokio::sync::{mpsc, oneshot};

use crate::config::{HubConfig, SendPolicy};
use crate::domain::ConnectionId;
use crate::error::HubError;

#[derive(Debug)]
struct QueuedFrame {
    text: String,
    handoff: Option<oneshot::Sender<()>>,
}

/// Producer side of a connection's outbound queue.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    owner: ConnectionId,
    tx: mpsc::Sender<QueuedFrame>,
    rendezvous: bool,
    policy: SendPolicy,
}

/// Consumer side of a connection's outbound queue.
#[derive(Debug)]
pub struct OutboundReceiver {
    rx: mpsc::Receiver<QueuedFrame>,
}

/// Creates the outbound queue for `owner` sized and policed by `config`.
#[must_use]
pub fn channel(owner: ConnectionId, config: &HubConfig) -> (OutboundQueue, OutboundReceiver) {
    let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
    (
        OutboundQueue {
            owner,
            tx,
            rendezvous: config.queue_capacity == 0,
            policy: config.send_policy,
        },
        OutboundReceiver { rx },
    )
}

impl OutboundQueue {
    /// Returns the connection this queue delivers to.
    #[must_use]
    pub const fn owner(&self) -> ConnectionId {
        self.owner
    }

    /// Enqueues an encoded frame according to the configured policy.
    ///
    /// # Errors
    ///
    /// - [`HubError::TransportClosed`] if the owner's outbound loop is gone.
    /// - [`HubError::QueueFull`] under [`SendPolicy::DropWhenFull`] when
    ///   no slot is free.
    pub async fn push(&self, text: String) -> Result<(), HubError> {
        match self.policy {
            SendPolicy::Block if self.rendezvous => {
                let (handoff, taken) = oneshot::channel();
                self.tx
                    .send(QueuedFrame {
                        text,
                        handoff: Some(handoff),
                    })
                    .await
                    .map_err(|_| HubError::TransportClosed)?;
                taken.await.map_err(|_| HubError::TransportClosed)
            }
            SendPolicy::Block => self
                .tx
                .send(QueuedFrame {
                    text,
                    handoff: None,
                })
                .await
                .map_err(|_| HubError::TransportClosed),
            SendPolicy::DropWhenFull => self
                .tx
                .try_send(QueuedFrame {
                    text,
                    handoff: None,
                })
                .map_err(|e| match e {
                    mpsc::error::TrySendError::Full(_) => HubError::QueueFull(self.owner),
                    mpsc::error::TrySendError::Closed(_) => HubError::TransportClosed,
                }),
        }
    }
}

impl OutboundReceiver {
    /// Takes the next frame, releasing a blocked rendezvous producer.
    ///
    /// Returns `None` once every producer handle has been dropped.
    pub async fn recv(&mut self) -> Option<String> {
        let item = self.rx.recv().await?;
        if let Some(handoff) = item.handoff {
            let _ = handoff.send(());
        }
        Some(item.text)
    }
}
