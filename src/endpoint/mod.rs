//! # Command endpoint.
//!
//! - [`Command`] / [`CommandKind`] - the JSON wire command
//! - [`Endpoint`] - applies commands to the hub and the scheduler
//! - [`SourceFactory`] - turns a client slug into a watched source

mod command;
#[allow(clippy::module_inception)]
mod endpoint;

pub use command::{Command, CommandKind};
pub use endpoint::{CommandOutcome, Endpoint, SourceFactory};
