//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the watchhub runtime.
//!
//! ## Sentinel values
//! - `grace = 0s` → do not wait for poll tasks on shutdown
//! - `bus_capacity = 0` / `connection_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::policies::JitterPolicy;

/// Global configuration for the runtime.
///
/// ## Field semantics
/// - `grace`: Maximum wait for poll tasks to stop on shutdown
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `jitter`: Randomization applied to every poll interval
/// - `default_interval`: Poll interval for sources built by the endpoint
/// - `connection_capacity`: Outbound queue size of channel-backed connections (min 1)
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for poll tasks to exit on shutdown.
    ///
    /// Exceeding it makes `shutdown` return `RuntimeError::GraceExceeded`.
    /// Zero cancels the tasks without waiting for them.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Listeners lagging behind more than `bus_capacity` events skip the oldest.
    pub bus_capacity: usize,

    /// Jitter applied to each source's poll interval.
    pub jitter: JitterPolicy,

    /// Poll interval of hashtag sources created from inbound commands.
    pub default_interval: Duration,

    /// Per-connection outbound queue size for [`ChannelConnection`](crate::ChannelConnection)s
    /// opened through the endpoint. A full queue drops the item and the connection.
    pub connection_capacity: usize,
}

impl Config {
    /// Returns the shutdown grace period, or `None` when shutdown should not wait.
    #[inline]
    pub fn grace_period(&self) -> Option<Duration> {
        (!self.grace.is_zero()).then_some(self.grace)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a connection queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn connection_capacity_clamped(&self) -> usize {
        self.connection_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    /// - `jitter = JitterPolicy::None` (exact intervals)
    /// - `default_interval = 2s`
    /// - `connection_capacity = 64`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
            jitter: JitterPolicy::None,
            default_interval: Duration::from_secs(2),
            connection_capacity: 64,
        }
    }
}
