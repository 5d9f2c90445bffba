//! Error types used by the watchhub runtime, sources, hub and endpoint.
//!
//! - [`RuntimeError`]: errors raised by the scheduler runtime itself.
//! - [`FetchError`]: a single fetch of a watched source failed (always transient).
//! - [`HubError`]: invariant violations reported by the delivery hub.
//! - [`DeliveryError`]: writing one item to one connection failed.
//! - [`CommandError`]: an inbound command could not be applied.
//!
//! Every type provides `as_label` (stable snake_case label for logs/metrics).
//! None of them is ever fatal to the process: callers log and continue.

use std::time::Duration;
use thiserror::Error;

use crate::hub::ConnectionId;

/// # Errors produced by the scheduler runtime.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some poll tasks were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Identifiers of the sources whose poll task did not exit in time.
        stuck: Vec<String>,
    },

    /// The scheduler has been shut down and no longer accepts watches.
    #[error("scheduler is shutting down")]
    ShuttingDown,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use watchhub::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::ShuttingDown.as_label(), "runtime_shutting_down");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::ShuttingDown => "runtime_shutting_down",
        }
    }
}

/// # Errors produced by a single fetch of a watched source.
///
/// The poll loop treats every variant as an empty batch: it reports the
/// failure and retries on the next tick.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The remote service could not be reached or answered with an error.
    #[error("source unavailable: {error}")]
    Unavailable {
        /// The underlying error message.
        error: String,
    },

    /// The remote answered, but the payload could not be turned into items.
    #[error("undecodable fetch result: {error}")]
    Decode {
        /// The underlying error message.
        error: String,
    },
}

impl FetchError {
    /// Shorthand for [`FetchError::Unavailable`].
    pub fn unavailable(error: impl Into<String>) -> Self {
        FetchError::Unavailable {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FetchError::Unavailable { .. } => "fetch_unavailable",
            FetchError::Decode { .. } => "fetch_decode",
        }
    }
}

/// # Errors reported by the delivery hub.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// The connection was never added (or was already removed).
    #[error("cannot subscribe unknown connection {id} to topic {topic:?}")]
    UnknownConnection {
        /// Offending connection.
        id: ConnectionId,
        /// Topic the caller tried to subscribe to.
        topic: String,
    },
}

impl HubError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HubError::UnknownConnection { .. } => "hub_unknown_connection",
        }
    }
}

/// # Errors produced while writing a delivery to one connection.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The consumer side has gone away.
    #[error("connection closed")]
    Closed,

    /// The connection's outbound buffer is full; the item is dropped.
    #[error("connection buffer full")]
    Full,

    /// The transport could not encode the delivery.
    #[error("encode failed: {error}")]
    Encode {
        /// The underlying error message.
        error: String,
    },
}

impl DeliveryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::Closed => "delivery_closed",
            DeliveryError::Full => "delivery_full",
            DeliveryError::Encode { .. } => "delivery_encode",
        }
    }
}

/// # Errors produced while handling one inbound command.
///
/// A rejected command is dropped; the connection that sent it stays open.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Payload is not a JSON command object.
    #[error("malformed command: {error}")]
    Malformed {
        /// The decoder's error message.
        error: String,
    },

    /// The `command` field names something other than `watch` / `unwatch`.
    #[error("unknown command {command:?}")]
    UnknownCommand {
        /// The command kind as received.
        command: String,
    },

    /// The `hashtag` field is absent or blank.
    #[error("command is missing a source slug")]
    MissingSlug,

    /// The hub refused the subscription.
    #[error(transparent)]
    Hub(#[from] HubError),

    /// The scheduler refused the watch.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl CommandError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use watchhub::CommandError;
    ///
    /// assert_eq!(CommandError::MissingSlug.as_label(), "command_missing_slug");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CommandError::Malformed { .. } => "command_malformed",
            CommandError::UnknownCommand { .. } => "command_unknown",
            CommandError::MissingSlug => "command_missing_slug",
            CommandError::Hub(e) => e.as_label(),
            CommandError::Runtime(e) => e.as_label(),
        }
    }
}
