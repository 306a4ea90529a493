//! Message dispatch engine
//!
//! Pulls raw messages from the message source, resolves matching
//! routes, decodes payloads and invokes handlers under a bounded
//! concurrency limit, isolating failures per invocation.

pub mod dispatcher;
pub mod stats;

pub use dispatcher::{DispatcherState, StopReason};
pub use stats::DispatchStats;

pub(crate) use dispatcher::Dispatcher;
pub(crate) use stats::StatsHandle;
