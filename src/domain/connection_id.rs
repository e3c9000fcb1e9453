//! Type-safe connection identifier.
//!
//! [`ConnectionId`] is a newtype wrapper around [`uuid::Uuid`] (v4) so that
//! connection identities cannot be confused with other UUIDs carried in
//! message payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique identity of a live connection.
///
/// Generated once when a transport is accepted and immutable thereafter.
/// Used as the membership key inside the hub and as the `Emit` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random `ConnectionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `ConnectionId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<uuid::Uuid> for ConnectionId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ConnectionId> for uuid::Uuid {
    fn from(id: ConnectionId) -> Self {
        id.0
    }
}
