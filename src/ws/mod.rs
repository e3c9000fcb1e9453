//! WebSocket layer: the `/ws` upgrade endpoint and the demo actions it
//! installs on every connection.
//!
//! The hub core does not define action semantics; [`demo`] is what the
//! bundled host offers so two browser tabs can talk to each other.

pub mod demo;
pub mod handler;
