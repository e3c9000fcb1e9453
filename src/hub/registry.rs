//! The hub control loop: sole owner of the live-connection set.
//!
//! [`Hub`] keeps membership in a plain `HashMap` that only its control
//! loop touches. Registration, deregistration, lookups and enumeration
//! all arrive as [`HubRequest`]s over one channel and are processed one
//! at a time, so no lock guards the map and a broadcast never iterates
//! a set that is being mutated.
//!
//! # Shutdown
//!
//! [`HubHandle::stop`] ends the control loop and nothing else. Connections
//! that are live at that point are not closed; they keep pumping until
//! their own transport fails, and their deregistration requests are lost.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::handle::HubHandle;
use super::queue::OutboundQueue;
use crate::config::HubConfig;
use crate::domain::{Codec, ConnectionId, JsonCodec};
use crate::error::HubError;

/// Membership entry for one live connection.
#[derive(Debug)]
pub(crate) struct Member {
    queue: OutboundQueue,
    closer: oneshot::Sender<()>,
}

impl Member {
    pub(crate) const fn new(queue: OutboundQueue, closer: oneshot::Sender<()>) -> Self {
        Self { queue, closer }
    }

    /// Closes the connection's outbound queue. Consumes the entry, so it
    /// can happen at most once.
    fn close(self) {
        let _ = self.closer.send(());
    }
}

/// Requests processed by the control loop.
#[derive(Debug)]
pub(crate) enum HubRequest {
    Register {
        id: ConnectionId,
        member: Member,
        ack: oneshot::Sender<()>,
    },
    Unregister {
        id: ConnectionId,
    },
    Lookup {
        id: ConnectionId,
        reply: oneshot::Sender<Option<OutboundQueue>>,
    },
    Peers {
        except: ConnectionId,
        reply: oneshot::Sender<Vec<OutboundQueue>>,
    },
    Members {
        reply: oneshot::Sender<Vec<ConnectionId>>,
    },
    Stop,
}

/// Registry of live connections.
///
/// Create it, take a [`HubHandle`] with [`Hub::handle`], then drive the
/// control loop with [`Hub::start`]:
///
/// ```no_run
/// # async fn run() {
/// use socketon::config::HubConfig;
/// use socketon::hub::Hub;
///
/// let hub = Hub::new(HubConfig::default());
/// let handle = hub.handle();
/// tokio::spawn(hub.start());
/// # let _ = handle.stop().await;
/// # }
/// ```
#[derive(Debug)]
pub struct Hub {
    requests: mpsc::Receiver<HubRequest>,
    handle: HubHandle,
    members: HashMap<ConnectionId, Member>,
}

impl Hub {
    /// Allocates an empty membership set and the control channel.
    #[must_use]
    pub fn new(config: HubConfig) -> Self {
        let (tx, requests) = mpsc::channel(config.control_capacity.max(1));
        let codec: Arc<dyn Codec> = Arc::new(JsonCodec);
        Self {
            requests,
            handle: HubHandle::new(tx, Arc::new(config), codec),
            members: HashMap::new(),
        }
    }

    /// Replaces the wire codec used by connections of this hub.
    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.handle.set_codec(codec);
        self
    }

    /// Installs a callback for frames that are dropped silently.
    ///
    /// Without an observer, decode failures, encode failures and full
    /// queues are only traced at `debug` level.
    #[must_use]
    pub fn with_error_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(ConnectionId, &HubError) + Send + Sync + 'static,
    {
        self.handle.set_observer(Arc::new(observer));
        self
    }

    /// Returns a request handle. [`Hub::start`] consumes the hub, so take
    /// handles before starting it and clone them from there.
    #[must_use]
    pub fn handle(&self) -> HubHandle {
        self.handle.clone()
    }

    /// Runs the control loop until a stop request arrives or every
    /// [`HubHandle`] has been dropped.
    pub async fn start(self) {
        let Self {
            mut requests,
            handle,
            mut members,
        } = self;
        // The loop must not keep its own channel open.
        drop(handle);

        tracing::info!("hub control loop started");
        while let Some(request) = requests.recv().await {
            match request {
                HubRequest::Register { id, member, ack } => {
                    members.insert(id, member);
                    tracing::debug!(connection_id = %id, members = members.len(), "connection registered");
                    let _ = ack.send(());
                }
                HubRequest::Unregister { id } => {
                    if let Some(member) = members.remove(&id) {
                        member.close();
                        tracing::debug!(connection_id = %id, members = members.len(), "connection unregistered");
                    }
                }
                HubRequest::Lookup { id, reply } => {
                    let _ = reply.send(members.get(&id).map(|m| m.queue.clone()));
                }
                HubRequest::Peers { except, reply } => {
                    let peers = members
                        .iter()
                        .filter(|(id, _)| **id != except)
                        .map(|(_, m)| m.queue.clone())
                        .collect();
                    let _ = reply.send(peers);
                }
                HubRequest::Members { reply } => {
                    let _ = reply.send(members.keys().copied().collect());
                }
                HubRequest::Stop => break,
            }
        }
        tracing::info!(members = members.len(), "hub control loop stopped");
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::hub::queue;
    use tokio::time::timeout;

    fn member(id: ConnectionId) -> (Member, queue::OutboundReceiver, oneshot::Receiver<()>) {
        let config = HubConfig {
            queue_capacity: 1,
            ..HubConfig::default()
        };
        let (q, rx) = queue::channel(id, &config);
        let (closer, closed) = oneshot::channel();
        (Member::new(q, closer), rx, closed)
    }

    fn spawn_hub() -> (HubHandle, tokio::task::JoinHandle<()>) {
        let hub = Hub::new(HubConfig::default());
        let handle = hub.handle();
        (handle, tokio::spawn(hub.start()))
    }

    #[tokio::test]
    async fn new_hub_is_empty() {
        let (handle, _task) = spawn_hub();
        let Ok(members) = handle.members().await else {
            panic!("hub should answer");
        };
        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn register_is_visible_to_lookup() {
        let (handle, _task) = spawn_hub();
        let id = ConnectionId::new();
        let (m, _rx, _closed) = member(id);

        assert!(handle.register(id, m).await.is_ok());
        let Ok(Some(found)) = handle.lookup(id).await else {
            panic!("registered connection should be found");
        };
        assert_eq!(found.owner(), id);
        assert_eq!(handle.contains(id).await, Ok(true));
    }

    #[tokio::test]
    async fn unregister_removes_and_closes_once() {
        let (handle, _task) = spawn_hub();
        let id = ConnectionId::new();
        let (m, _rx, closed) = member(id);
        assert!(handle.register(id, m).await.is_ok());

        assert!(handle.unregister(id).await.is_ok());
        let Ok(Ok(())) = timeout(Duration::from_secs(1), closed).await else {
            panic!("closer should fire on unregister");
        };
        assert_eq!(handle.contains(id).await, Ok(false));

        // Second unregister is a no-op.
        assert!(handle.unregister(id).await.is_ok());
        assert_eq!(handle.members().await, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn unregister_unknown_is_noop() {
        let (handle, _task) = spawn_hub();
        let id = ConnectionId::new();
        let (m, _rx, _closed) = member(id);
        assert!(handle.register(id, m).await.is_ok());

        assert!(handle.unregister(ConnectionId::new()).await.is_ok());
        assert_eq!(handle.members().await, Ok(vec![id]));
    }

    #[tokio::test]
    async fn peers_excludes_requester() {
        let (handle, _task) = spawn_hub();
        let ids = [ConnectionId::new(), ConnectionId::new(), ConnectionId::new()];
        let mut keep = Vec::new();
        for id in ids {
            let (m, rx, closed) = member(id);
            keep.push((rx, closed));
            assert!(handle.register(id, m).await.is_ok());
        }

        let [sender, b, c] = ids;
        let Ok(peers) = handle.peers(sender).await else {
            panic!("hub should answer");
        };
        let mut owners: Vec<_> = peers.iter().map(OutboundQueue::owner).collect();
        owners.sort();
        let mut expected = vec![b, c];
        expected.sort();
        assert_eq!(owners, expected);
    }

    #[tokio::test]
    async fn stop_ends_loop_and_rejects_requests() {
        let (handle, task) = spawn_hub();
        assert!(handle.stop().await.is_ok());
        let Ok(Ok(())) = timeout(Duration::from_secs(1), task).await else {
            panic!("control loop should exit after stop");
        };
        assert_eq!(handle.members().await, Err(HubError::HubStopped));
        assert_eq!(handle.stop().await, Err(HubError::HubStopped));
    }

    #[tokio::test]
    async fn stop_does_not_close_live_members() {
        let (handle, task) = spawn_hub();
        let id = ConnectionId::new();
        let (m, _rx, closed) = member(id);
        assert!(handle.register(id, m).await.is_ok());

        assert!(handle.stop().await.is_ok());
        let _ = timeout(Duration::from_secs(1), task).await;

        // The closer is dropped, never fired.
        assert!(closed.await.is_err());
    }

    #[tokio::test]
    async fn loop_exits_when_all_handles_dropped() {
        let (handle, task) = spawn_hub();
        drop(handle);
        assert!(timeout(Duration::from_secs(1), task).await.is_ok());
    }
}
