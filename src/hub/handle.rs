//! Cloneable front-end to the hub control loop.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::queue::OutboundQueue;
use super::registry::{HubRequest, Member};
use crate::config::HubConfig;
use crate::domain::{Codec, ConnectionId};
use crate::error::HubError;

/// Callback invoked for frames the pumps drop instead of failing loudly:
/// decode failures, encode failures and full queues.
pub type ErrorObserver = Arc<dyn Fn(ConnectionId, &HubError) + Send + Sync>;

/// Request handle for a running [`Hub`](super::Hub).
///
/// Every membership read and write goes through the control channel and is
/// answered by the control loop, one request at a time. Once the loop has
/// exited every request fails with [`HubError::HubStopped`].
#[derive(Clone)]
pub struct HubHandle {
    requests: mpsc::Sender<HubRequest>,
    config: Arc<HubConfig>,
    codec: Arc<dyn Codec>,
    observer: Option<ErrorObserver>,
}

impl fmt::Debug for HubHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubHandle")
            .field("config", &self.config)
            .field("codec", &self.codec)
            .field("observer", &self.observer.is_some())
            .field("stopped", &self.requests.is_closed())
            .finish()
    }
}

impl HubHandle {
    pub(super) fn new(
        requests: mpsc::Sender<HubRequest>,
        config: Arc<HubConfig>,
        codec: Arc<dyn Codec>,
    ) -> Self {
        Self {
            requests,
            config,
            codec,
            observer: None,
        }
    }

    pub(super) fn set_codec(&mut self, codec: Arc<dyn Codec>) {
        self.codec = codec;
    }

    pub(super) fn set_observer(&mut self, observer: ErrorObserver) {
        self.observer = Some(observer);
    }

    /// Returns the configuration shared by the hub and its connections.
    #[must_use]
    pub const fn config(&self) -> &Arc<HubConfig> {
        &self.config
    }

    /// Returns the wire codec used by every connection of this hub.
    #[must_use]
    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    /// Returns the ids of all live connections.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubStopped`] if the control loop has exited.
    pub async fn members(&self) -> Result<Vec<ConnectionId>, HubError> {
        self.request(|reply| HubRequest::Members { reply }).await
    }

    /// Returns `true` if `id` is currently registered.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubStopped`] if the control loop has exited.
    pub async fn contains(&self, id: ConnectionId) -> Result<bool, HubError> {
        Ok(self.lookup(id).await?.is_some())
    }

    /// Asks the control loop to terminate.
    ///
    /// Returns once the request is queued, not once the loop has exited.
    /// Live connections are left running.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubStopped`] if the control loop already exited.
    pub async fn stop(&self) -> Result<(), HubError> {
        self.requests
            .send(HubRequest::Stop)
            .await
            .map_err(|_| HubError::HubStopped)
    }

    pub(crate) async fn register(&self, id: ConnectionId, member: Member) -> Result<(), HubError> {
        self.request(|ack| HubRequest::Register { id, member, ack })
            .await
    }

    pub(crate) async fn unregister(&self, id: ConnectionId) -> Result<(), HubError> {
        self.requests
            .send(HubRequest::Unregister { id })
            .await
            .map_err(|_| HubError::HubStopped)
    }

    pub(crate) async fn lookup(&self, id: ConnectionId) -> Result<Option<OutboundQueue>, HubError> {
        self.request(|reply| HubRequest::Lookup { id, reply }).await
    }

    pub(crate) async fn peers(&self, except: ConnectionId) -> Result<Vec<OutboundQueue>, HubError> {
        self.request(|reply| HubRequest::Peers { except, reply })
            .await
    }

    /// Traces a swallowed failure and forwards it to the observer, if any.
    pub(crate) fn report(&self, connection_id: ConnectionId, error: &HubError) {
        tracing::debug!(%connection_id, %error, "frame dropped");
        if let Some(observer) = &self.observer {
            observer(connection_id, error);
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> HubRequest,
    ) -> Result<T, HubError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(make(reply))
            .await
            .map_err(|_| HubError::HubStopped)?;
        response.await.map_err(|_| HubError::HubStopped)
    }
}
