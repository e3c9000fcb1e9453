//! Domain layer: connection identity, message envelope, and wire codec.
//!
//! These types carry no behavior of their own; the hub and the connection
//! pumps are built on top of them.

pub mod codec;
pub mod connection_id;
pub mod message;

pub use codec::{Codec, JsonCodec};
pub use connection_id::ConnectionId;
pub use message::Message;
