//! # Built-in subscribers
//!
//! - [`LogWriter`]: renders events as `tracing` records (requires the `logging` feature).

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
