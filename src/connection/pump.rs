//! Per-connection read and write pumps.
//!
//! Every accepted transport gets two tasks: an inbound loop that reads
//! frames, decodes them and dispatches to the action table, and an outbound
//! loop that drains the connection's queue and sends liveness probes. The
//! outbound loop is the only writer to the transport.
//!
//! Liveness: the inbound loop gives up when nothing at all (data, ping or
//! pong) arrives within `pong_wait`; the outbound loop pings every
//! `ping_period`, which is strictly shorter, so a healthy peer's pong always
//! lands inside the window.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, interval_at, timeout, timeout_at};

use super::actions::{ActionHandler, ActionTable, Registration};
use crate::config::HubConfig;
use crate::domain::{ConnectionId, Message};
use crate::error::HubError;
use crate::hub::registry::Member;
use crate::hub::{HubHandle, OutboundQueue, OutboundReceiver, queue};
use crate::transport::{Frame, Transport};

/// Application-facing handle to one live connection.
///
/// Cheap to clone; every clone refers to the same connection. Handlers
/// receive a clone as their first argument.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    hub: HubHandle,
    registrations: mpsc::UnboundedSender<Registration>,
}

impl Connection {
    /// Registers a new connection with the hub and starts its pumps.
    ///
    /// Returns once the hub has acknowledged the registration, so the new
    /// connection is already visible to `emit` and `broadcast` from every
    /// other connection.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubStopped`] if the hub control loop is not
    /// running. The transport is dropped in that case.
    pub async fn accept<T: Transport>(hub: &HubHandle, transport: T) -> Result<Self, HubError> {
        Self::accept_with(hub, transport, |_| {}).await
    }

    /// Like [`Connection::accept`], but runs `setup` before the pumps start.
    ///
    /// Handlers registered with [`Connection::on`] inside `setup` are in
    /// the table before the first inbound frame is dispatched, so a frame
    /// the peer sends right after connecting is never lost.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubStopped`] if the hub control loop is not
    /// running. `setup` is not called in that case.
    pub async fn accept_with<T, F>(hub: &HubHandle, transport: T, setup: F) -> Result<Self, HubError>
    where
        T: Transport,
        F: FnOnce(&Self),
    {
        let id = ConnectionId::new();
        let config = Arc::clone(hub.config());

        let (queue, outbound) = queue::channel(id, &config);
        let (closer, closed) = oneshot::channel();
        hub.register(id, Member::new(queue, closer)).await?;

        let (registrations, pending) = mpsc::unbounded_channel();
        let conn = Self {
            id,
            hub: hub.clone(),
            registrations,
        };
        setup(&conn);

        // Fires when the inbound loop exits, whether or not the hub is
        // still there to close the queue.
        let (finished, reader_gone) = oneshot::channel();

        let (sink, stream) = transport.split();
        tokio::spawn(write_pump(id, sink, outbound, closed, reader_gone, config));
        tokio::spawn(read_pump(conn.clone(), stream, pending, finished));

        Ok(conn)
    }

    /// Returns this connection's identity.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the hub this connection is registered with.
    #[must_use]
    pub const fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Registers `handler` for `action`, replacing any earlier handler for
    /// the same name.
    ///
    /// Takes effect before the inbound loop dispatches its next frame.
    pub fn on<H: ActionHandler>(&self, action: impl Into<String>, handler: H) {
        let registration = Registration {
            action: action.into(),
            handler: Arc::new(handler),
        };
        if self.registrations.send(registration).is_err() {
            tracing::trace!(connection_id = %self.id, "handler registered on closed connection");
        }
    }

    /// Sends `message` to connection `to`.
    ///
    /// Silently does nothing if `to` is not live. Encode failures and full
    /// queues are reported only to the hub's error observer. Under the
    /// blocking send policy this waits until the target's outbound loop
    /// has room.
    pub async fn emit(&self, to: ConnectionId, message: &Message) {
        let queue = match self.hub.lookup(to).await {
            Ok(Some(queue)) => queue,
            Ok(None) | Err(_) => {
                tracing::trace!(connection_id = %self.id, target = %to, "emit target not live");
                return;
            }
        };
        let Some(frame) = self.encode(message) else {
            return;
        };
        self.deliver(&queue, frame).await;
    }

    /// Sends `message` to every live connection except this one.
    ///
    /// Each recipient gets an independent enqueue; a closed or full queue
    /// does not stop delivery to the rest.
    pub async fn broadcast(&self, message: &Message) {
        let Some(frame) = self.encode(message) else {
            return;
        };
        let Ok(peers) = self.hub.peers(self.id).await else {
            tracing::trace!(connection_id = %self.id, "broadcast on stopped hub");
            return;
        };
        for queue in &peers {
            self.deliver(queue, frame.clone()).await;
        }
    }

    fn encode(&self, message: &Message) -> Option<String> {
        match self.hub.codec().encode(message) {
            Ok(frame) => Some(frame),
            Err(err) => {
                self.hub.report(self.id, &err);
                None
            }
        }
    }

    async fn deliver(&self, queue: &OutboundQueue, frame: String) {
        match queue.push(frame).await {
            Ok(()) => {}
            Err(HubError::TransportClosed) => {
                tracing::trace!(connection_id = %self.id, target = %queue.owner(), "target queue closed");
            }
            Err(err) => self.hub.report(self.id, &err),
        }
    }

    /// Decodes one text frame and runs the matching handler, if any.
    async fn dispatch(&self, actions: &ActionTable, raw: &str) {
        let text = raw.replace('\n', " ");
        let message = match self.hub.codec().decode(text.trim()) {
            Ok(message) => message,
            Err(err) => {
                self.hub.report(self.id, &err);
                return;
            }
        };

        let (action, data) = message.into_parts();
        match actions.get(&action) {
            Some(handler) => handler.call(self.clone(), data).await,
            None => {
                tracing::trace!(connection_id = %self.id, %action, "no handler for action");
            }
        }
    }
}

/// Inbound loop. Exits on read failure, close, oversize frame or read
/// deadline, then asks the hub to unregister the connection and tells the
/// outbound loop to close the transport.
async fn read_pump<S>(
    conn: Connection,
    mut stream: S,
    mut pending: mpsc::UnboundedReceiver<Registration>,
    finished: oneshot::Sender<()>,
) where
    S: Stream<Item = Result<Frame, HubError>> + Unpin,
{
    let config = Arc::clone(conn.hub.config());
    let mut actions = ActionTable::default();
    let mut deadline = Instant::now() + config.pong_wait;

    let reason = loop {
        tokio::select! {
            biased;

            Some(registration) = pending.recv() => {
                tracing::trace!(connection_id = %conn.id, action = %registration.action, "handler registered");
                actions.insert(registration);
            }
            next = timeout_at(deadline, stream.next()) => {
                let frame = match next {
                    Err(_) => break HubError::ReadTimeout,
                    Ok(None) => break HubError::TransportClosed,
                    Ok(Some(Err(err))) => break err,
                    Ok(Some(Ok(frame))) => frame,
                };
                if frame.len() > config.max_message_size {
                    break HubError::FrameTooLarge {
                        size: frame.len(),
                        limit: config.max_message_size,
                    };
                }
                deadline = Instant::now() + config.pong_wait;

                match frame {
                    Frame::Text(text) => conn.dispatch(&actions, &text).await,
                    Frame::Binary(bytes) => match String::from_utf8(bytes) {
                        Ok(text) => conn.dispatch(&actions, &text).await,
                        Err(err) => conn.hub.report(conn.id, &HubError::Decode(err.to_string())),
                    },
                    Frame::Ping(_) | Frame::Pong(_) => {}
                    Frame::Close => break HubError::TransportClosed,
                }
            }
        }
    };

    match &reason {
        HubError::Transport(_) => {
            tracing::warn!(connection_id = %conn.id, error = %reason, handlers = actions.len(), "read pump failed");
        }
        _ => {
            tracing::debug!(connection_id = %conn.id, error = %reason, handlers = actions.len(), "read pump exited");
        }
    }

    if conn.hub.unregister(conn.id).await.is_err() {
        tracing::debug!(connection_id = %conn.id, "hub stopped before unregister");
    }
    let _ = finished.send(());
}

/// Outbound loop. Sole writer to the transport.
///
/// Ends with a close frame when the hub closes the queue or the inbound
/// loop exits, whichever comes first, and then closes the sink.
async fn write_pump<K>(
    id: ConnectionId,
    mut sink: K,
    mut outbound: OutboundReceiver,
    mut closed: oneshot::Receiver<()>,
    mut reader_gone: oneshot::Receiver<()>,
    config: Arc<HubConfig>,
) where
    K: Sink<Frame, Error = HubError> + Unpin,
{
    let mut ticker = interval_at(Instant::now() + config.ping_period, config.ping_period);
    // Cleared once the hub drops the closer without firing it (hub stopped).
    let mut closable = true;

    let outcome = loop {
        tokio::select! {
            biased;

            Some(text) = outbound.recv() => {
                if let Err(err) = write_frame(&mut sink, Frame::Text(text), config.write_wait).await {
                    break Err(err);
                }
            }
            signal = &mut closed, if closable => {
                if signal.is_ok() {
                    break write_frame(&mut sink, Frame::Close, config.write_wait).await;
                }
                closable = false;
            }
            _ = &mut reader_gone => {
                break write_frame(&mut sink, Frame::Close, config.write_wait).await;
            }
            _ = ticker.tick() => {
                if let Err(err) = write_frame(&mut sink, Frame::Ping(Vec::new()), config.write_wait).await {
                    break Err(err);
                }
            }
        }
    };

    match outcome {
        Ok(()) => tracing::debug!(connection_id = %id, "write pump closed"),
        Err(err) => tracing::debug!(connection_id = %id, error = %err, "write pump failed"),
    }
    if let Ok(Err(err)) = timeout(config.write_wait, sink.close()).await {
        tracing::trace!(connection_id = %id, error = %err, "transport close failed");
    }
}

async fn write_frame<K>(sink: &mut K, frame: Frame, wait: Duration) -> Result<(), HubError>
where
    K: Sink<Frame, Error = HubError> + Unpin,
{
    timeout(wait, sink.send(frame))
        .await
        .unwrap_or(Err(HubError::WriteTimeout))
}
