//! Connection layer: the per-connection pumps and the action table.
//!
//! A [`Connection`] wraps one transport for its whole lifetime. Application
//! code registers handlers with [`Connection::on`] and talks to peers with
//! [`Connection::emit`] and [`Connection::broadcast`].

pub mod actions;
pub mod pump;

pub use actions::ActionHandler;
pub use pump::Connection;
