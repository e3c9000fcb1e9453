//! Action dispatch table.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::Connection;

/// Handler for one action name.
///
/// Implemented for every `Fn(Connection, serde_json::Value) -> impl Future`
/// closure, so most callers never implement it by hand. The returned future
/// is awaited on the connection's inbound loop before the next frame is read.
pub trait ActionHandler: Send + Sync + 'static {
    /// Handles one decoded message addressed to this action.
    fn call(&self, conn: Connection, data: serde_json::Value) -> BoxFuture<'static, ()>;
}

impl<F, Fut> ActionHandler for F
where
    F: Fn(Connection, serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, conn: Connection, data: serde_json::Value) -> BoxFuture<'static, ()> {
        Box::pin(self(conn, data))
    }
}

/// A pending `On` call, applied by the inbound loop.
pub(crate) struct Registration {
    pub(crate) action: String,
    pub(crate) handler: Arc<dyn ActionHandler>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

/// Mapping from action name to handler. One handler per name; a later
/// registration replaces the earlier one.
#[derive(Default)]
pub(crate) struct ActionTable {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl fmt::Debug for ActionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

impl ActionTable {
    pub(crate) fn insert(&mut self, registration: Registration) {
        self.handlers
            .insert(registration.action, registration.handler);
    }

    pub(crate) fn get(&self, action: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(action).map(Arc::clone)
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }
}
