//! Hub and server configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Durations are given in milliseconds.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::HubError;

/// Upper bound for every configured duration. Keeps deadline arithmetic on
/// `Instant` well inside its range.
pub const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// What `Emit`/`Broadcast` do when the target's outbound queue has no room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendPolicy {
    /// Wait until the target's outbound loop makes room. A stalled peer
    /// stalls the sender.
    #[default]
    Block,
    /// Drop the frame and report [`HubError::QueueFull`] to the observer.
    DropWhenFull,
}

impl FromStr for SendPolicy {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "drop" | "drop_when_full" => Ok(Self::DropWhenFull),
            other => Err(HubError::InvalidConfig(format!(
                "unknown send policy: {other}"
            ))),
        }
    }
}

/// Timing and sizing constants shared by the hub and every connection pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Time allowed to write a single frame to the peer.
    pub write_wait: Duration,

    /// Read deadline: time allowed between two inbound frames (data or pong).
    pub pong_wait: Duration,

    /// Interval between liveness probes. Must be less than `pong_wait`.
    pub ping_period: Duration,

    /// Maximum inbound frame size in bytes.
    pub max_message_size: usize,

    /// Slots in each connection's outbound queue. `0` is a rendezvous.
    pub queue_capacity: usize,

    /// Behavior of `Emit`/`Broadcast` on a full queue.
    pub send_policy: SendPolicy,

    /// Capacity of the hub's control channel.
    pub control_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        let pong_wait = Duration::from_secs(60);
        Self {
            write_wait: Duration::from_secs(10),
            pong_wait,
            ping_period: pong_wait * 9 / 10,
            max_message_size: 512,
            queue_capacity: 0,
            send_policy: SendPolicy::Block,
            control_capacity: 64,
        }
    }
}

impl HubConfig {
    /// Loads hub settings from environment variables.
    ///
    /// Unset or unparseable numeric variables fall back to [`Default`].
    /// `HUB_PING_PERIOD_MS` defaults to nine tenths of `HUB_PONG_WAIT_MS`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidConfig`] if `HUB_SEND_POLICY` is not a
    /// known policy or the resulting values fail [`HubConfig::validate`].
    pub fn from_env() -> Result<Self, HubError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let pong_wait = parse_env_millis("HUB_PONG_WAIT_MS", defaults.pong_wait);
        let ping_period = parse_env_millis("HUB_PING_PERIOD_MS", pong_wait * 9 / 10);

        let send_policy = match std::env::var("HUB_SEND_POLICY") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.send_policy,
        };

        let config = Self {
            write_wait: parse_env_millis("HUB_WRITE_WAIT_MS", defaults.write_wait),
            pong_wait,
            ping_period,
            max_message_size: parse_env("HUB_MAX_MESSAGE_SIZE", defaults.max_message_size),
            queue_capacity: parse_env("HUB_QUEUE_CAPACITY", defaults.queue_capacity),
            send_policy,
            control_capacity: parse_env("HUB_CONTROL_CAPACITY", defaults.control_capacity),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the pumps rely on.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidConfig`] if any duration is zero or
    /// above [`MAX_WAIT`], the probe interval is not strictly below the
    /// read deadline, or a size limit is zero.
    pub fn validate(&self) -> Result<(), HubError> {
        if self.write_wait.is_zero() || self.pong_wait.is_zero() || self.ping_period.is_zero() {
            return Err(HubError::InvalidConfig(
                "durations must be non-zero".to_string(),
            ));
        }
        if self.write_wait > MAX_WAIT || self.pong_wait > MAX_WAIT {
            return Err(HubError::InvalidConfig(format!(
                "durations must not exceed {MAX_WAIT:?}"
            )));
        }
        if self.ping_period >= self.pong_wait {
            return Err(HubError::InvalidConfig(format!(
                "ping period {:?} must be less than pong wait {:?}",
                self.ping_period, self.pong_wait
            )));
        }
        if self.max_message_size == 0 {
            return Err(HubError::InvalidConfig(
                "max message size must be non-zero".to_string(),
            ));
        }
        if self.control_capacity == 0 {
            return Err(HubError::InvalidConfig(
                "control channel capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Host process configuration: where to listen plus the hub settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Settings handed to the hub and its connections.
    pub hub: HubConfig,
}

impl ServerConfig {
    /// Loads the full server configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidConfig`] if `LISTEN_ADDR` is set but
    /// cannot be parsed, or if the hub settings are invalid.
    pub fn from_env() -> Result<Self, HubError> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| HubError::InvalidConfig(format!("LISTEN_ADDR: {e}")))?;

        Ok(Self {
            listen_addr,
            hub: HubConfig::from_env()?,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable holding a millisecond count.
fn parse_env_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
