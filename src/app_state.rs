//! Shared application state injected into all Axum handlers.

use chrono::{DateTime, Utc};

use crate::hub::HubHandle;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Request handle for the running hub.
    pub hub: HubHandle,
    /// When the host process started serving.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Creates state around a hub handle, stamping the start time.
    #[must_use]
    pub fn new(hub: HubHandle) -> Self {
        Self {
            hub,
            started_at: Utc::now(),
        }
    }
}
