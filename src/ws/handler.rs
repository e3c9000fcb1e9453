//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;

use super::demo;
use crate::app_state::AppState;
use crate::connection::Connection;
use crate::hub::HubHandle;
use crate::transport::WsTransport;

/// Upgrade buffer sizes.
const BUFFER_SIZE: usize = 1024;

/// `GET /ws` — Upgrade HTTP connection to WebSocket and hand it to the hub.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let limit = state.hub.config().max_message_size;
    let hub = state.hub;

    ws.read_buffer_size(BUFFER_SIZE)
        .write_buffer_size(BUFFER_SIZE)
        .max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| accept(hub, socket))
}

async fn accept(hub: HubHandle, socket: WebSocket) {
    match Connection::accept_with(&hub, WsTransport::new(socket), demo::install).await {
        Ok(conn) => {
            tracing::info!(connection_id = %conn.id(), "ws: client connected");
        }
        Err(error) => {
            tracing::warn!(%error, "ws: connection rejected");
        }
    }
}
