//! # socketon
//!
//! Minimal real-time messaging hub. Accepts many concurrent WebSocket
//! (or any framed, bidirectional) connections, tags each with a
//! [`ConnectionId`](domain::ConnectionId), and lets them exchange
//! action/payload [`Message`](domain::Message)s with one peer (`emit`),
//! with every peer (`broadcast`), or through per-connection action
//! handlers (`on`).
//!
//! Delivery is best effort. Malformed frames, unknown actions, departed
//! targets and encode failures are dropped silently; install an error
//! observer on the [`Hub`](hub::Hub) to see them.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)
//!     │
//!     ├── WS Handler (ws/) ──── HTTP endpoints (api/)
//!     │
//!     ├── Transport (transport/)      Frame stream + sink
//!     │
//!     ├── Connection pumps (connection/)
//!     │       inbound loop ── action table
//!     │       outbound loop ── outbound queue, pings
//!     │
//!     └── Hub control loop (hub/)     sole owner of membership
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod connection;
pub mod domain;
pub mod error;
pub mod hub;
pub mod transport;
pub mod ws;
