//! Client facade module
//!
//! The public object applications use to register routes, start the
//! dispatcher and publish outbound messages. Composes the route
//! table, codec registry and dispatcher, and owns the message
//! source/sink collaborators.

pub mod config;
pub mod error;
pub mod facade;

pub use config::{DEFAULT_MAX_IN_FLIGHT, DispatchConfig};
pub use error::ClientError;
pub use facade::DispatchClient;
