//! # MQTT Dispatch
//!
//! A typed topic routing and dispatch core for MQTT-style
//! publish/subscribe, independent of any particular broker client.
//!
//! ## Features
//!
//! - **Pattern-based Routing**: MQTT wildcard filters (`+`, `#`) with
//!   registration-order dispatch
//! - **Typed Payloads**: handlers receive decoded values, not raw
//!   bytes; pluggable codecs (bincode included, JSON behind the
//!   `json` feature)
//! - **Bounded Concurrency**: at most `max_in_flight` handler
//!   invocations at once, with intake backpressure towards the source
//! - **Failure Isolation**: decode or handler failures are contained
//!   per (message, route) pair and never stop the dispatcher
//! - **Graceful Shutdown**: draining stop that awaits all in-flight
//!   handlers
//! - **Abstract Transport**: any message source/sink pair works; a
//!   `rumqttc` adapter and an in-memory channel transport ship with
//!   the crate
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bincode::{Decode, Encode};
//! use mqtt_dispatch::transport::memory;
//! use mqtt_dispatch::{
//! 	BincodeCodec, DecodedMessage, DispatchClient, DispatchConfig,
//! 	HandlerOutcome, Response,
//! };
//!
//! #[derive(Encode, Decode, Debug)]
//! struct SensorData {
//! 	temperature: f64,
//! 	humidity: f64,
//! }
//!
//! async fn on_sensor_data(
//! 	message: DecodedMessage<SensorData>,
//! ) -> HandlerOutcome<SensorData> {
//! 	println!("{}: {:?}", message.topic, message.payload);
//! 	// A handler may answer with an outbound message; the
//! 	// dispatcher encodes and publishes it on the handler's behalf.
//! 	Ok(Some(Response::new("sensors/echo", message.payload)))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! 	let (inbound, source) = memory::channel_source(64);
//! 	let (sink, _outbound) = memory::channel_sink();
//!
//! 	let client = DispatchClient::<_, BincodeCodec>::new(
//! 		source,
//! 		sink,
//! 		DispatchConfig::new().with_max_in_flight(8),
//! 	);
//!
//! 	// Registration phase: routes are fixed once start() is called.
//! 	client.route::<SensorData, _>("sensors/+/data", on_sensor_data)?;
//! 	client.start()?;
//!
//! 	// Outbound publishing is independent of the dispatcher state.
//! 	let data = SensorData { temperature: 23.5, humidity: 45.0 };
//! 	client.publish("sensors/kitchen/data", &data).await?;
//!
//! 	// Feed inbound messages through the source side.
//! 	drop(inbound);
//!
//! 	client.stop().await?;
//! 	Ok(())
//! }
//! ```
//!
//! ## Pattern Matching
//!
//! Topic filters follow MQTT subscription semantics:
//!
//! - `+` matches exactly one topic level (e.g. `sensors/+/data`)
//! - `#` matches all remaining levels, including none (e.g.
//!   `sensors/#` matches `sensors`)
//! - topics starting with `$` (broker-internal, e.g. `$SYS/...`) are
//!   never matched by a leading wildcard
//!
//! ## Custom Codecs
//!
//! Implement the [`MessageCodec`] trait to plug in a custom wire
//! format; see the trait documentation for an example.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

// Core modules
pub mod client;
pub mod codec;
pub mod dispatch;
pub mod message;
pub mod routing;
pub mod topic;
pub mod transport;

// === Core Public API ===
// Client facade
pub use client::{
	ClientError, DEFAULT_MAX_IN_FLIGHT, DispatchClient, DispatchConfig,
};

// Payload codecs
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use codec::{BincodeCodec, MessageCodec, PayloadType};

// Handler surface
pub use routing::{
	DecodedMessage, HandlerError, HandlerOutcome, Response, RouteHandler,
};

// Dispatcher lifecycle
pub use dispatch::{DispatchStats, DispatcherState, StopReason};

// Message and transport seam
pub use message::{QoS, RawMessage};
pub use transport::{MessageSink, MessageSource};

// === Advanced API ===
// Topic types (for manual filter handling)
pub use topic::{TopicFilter, TopicPath};

/// Result type alias for operations that may fail with [`ClientError`]
pub type Result<T> = std::result::Result<T, ClientError>;

/// Prelude module for convenient imports
///
/// ```rust
/// use mqtt_dispatch::prelude::*;
/// ```
pub mod prelude {
	//! Essential types for most dispatch applications

	pub use crate::{
		BincodeCodec, ClientError, DecodedMessage, DispatchClient,
		DispatchConfig, HandlerOutcome, MessageCodec, QoS, Response,
		Result, StopReason,
	};
}

/// Advanced types and utilities for complex use cases
///
/// - Manual route table and codec registry handling
/// - Custom transport implementations
/// - Dispatch statistics
pub mod advanced {
	//! Advanced types for complex use cases

	pub use crate::codec::CodecRegistry;
	pub use crate::dispatch::{DispatchStats, DispatcherState};
	pub use crate::message::RawMessage;
	pub use crate::routing::{Route, RouteTable};
	pub use crate::topic::{FilterSegment, TopicFilter, TopicPath};
	pub use crate::transport::{MessageSink, MessageSource, SinkError};
}

/// Error types used throughout the library
///
/// Re-exports all error types in one convenient location.
pub mod errors {
	//! All error types used in the library

	pub use crate::client::ClientError;
	pub use crate::codec::{DecodeError, EncodeError};
	pub use crate::routing::{HandlerError, RouteError};
	pub use crate::topic::TopicFilterError;
	pub use crate::transport::SinkError;
}
