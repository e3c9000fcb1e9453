//! Hub layer: the live-connection registry and its request handle.
//!
//! The [`Hub`] control loop owns membership; everything else talks to it
//! through a [`HubHandle`]. Each member contributes an [`OutboundQueue`]
//! that `Emit` and `Broadcast` push encoded frames into.

pub mod handle;
pub mod queue;
pub mod registry;

pub use handle::{ErrorObserver, HubHandle};
pub use queue::{OutboundQueue, OutboundReceiver};
pub use registry::Hub;
