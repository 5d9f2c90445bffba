//! Runtime core: polling, lifecycle and wiring.
//!
//! Internal modules:
//! - [`runner`]: one poll cycle (fetch, sort, dedup, receive) with event publishing;
//! - [`actor`]: the long-running poll loop of one source;
//! - [`registry`]: one task per identifier, interest counters, draining;
//! - [`scheduler`]: public watch/unwatch/shutdown API;
//! - [`builder`]: assembles the [`Runtime`];
//! - [`config`]: global settings.

mod actor;
mod builder;
mod config;
mod registry;
mod runner;
mod scheduler;

pub use builder::{Runtime, RuntimeBuilder};
pub use config::Config;
pub use registry::{UnwatchOutcome, WatchOutcome};
pub use scheduler::Scheduler;
