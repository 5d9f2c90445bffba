//! Scheduling policies.
//!
//! ## Contents
//! - [`JitterPolicy`] randomization of the sleep between poll cycles
//!
//! ## Quick wiring
//! ```text
//! Config { jitter: JitterPolicy, .. }
//!      └─► core::actor::PollActor uses jitter.apply(source.interval())
//!          to compute each cancellable sleep
//! ```

mod jitter;

pub use jitter::JitterPolicy;
