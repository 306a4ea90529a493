//! Collaborator interfaces to the underlying publish/subscribe client
//!
//! The dispatch core never talks to a broker directly. It consumes an
//! abstract [`MessageSource`] yielding inbound messages and publishes
//! through an abstract [`MessageSink`]. Connection management,
//! reconnect policy, TLS and authentication all live behind these
//! seams.

pub mod memory;
pub mod rumqtt;

use async_trait::async_trait;
use thiserror::Error;

use crate::message::{QoS, RawMessage};

/// Failure of a publish attempt, surfaced to the caller of `publish`.
#[derive(Error, Debug, Clone)]
pub enum SinkError {
	/// The sink no longer accepts messages.
	#[error("Message sink closed while publishing to '{topic}'")]
	Closed { topic: String },

	/// The underlying client rejected the publish.
	#[error("Publish to '{topic}' rejected: {reason}")]
	Rejected { topic: String, reason: String },
}

impl SinkError {
	/// Creates a new Closed error
	pub fn closed(topic: impl Into<String>) -> Self {
		Self::Closed {
			topic: topic.into(),
		}
	}

	/// Creates a new Rejected error
	pub fn rejected(
		topic: impl Into<String>,
		reason: impl std::fmt::Display,
	) -> Self {
		Self::Rejected {
			topic: topic.into(),
			reason: reason.to_string(),
		}
	}
}

/// A lazy, potentially infinite sequence of inbound messages.
///
/// `recv` is the dispatcher's sole intake suspension point. Returning
/// `None` is the distinguished source-closed condition (connection
/// loss or shutdown of the underlying client); the dispatcher then
/// drains and stops. Reconnection policy, if any, lives behind the
/// source implementation, which may transparently resume the sequence
/// after a reconnect instead of closing it.
#[async_trait]
pub trait MessageSource: Send + 'static {
	/// Waits for the next inbound message; `None` means the source is
	/// closed.
	async fn recv(&mut self) -> Option<RawMessage>;
}

/// Accepts outbound messages for publication.
///
/// Publish failures are returned to the caller, never swallowed.
#[async_trait]
pub trait MessageSink: Send + Sync + 'static {
	/// Publishes `payload` on `topic` with the given delivery
	/// metadata.
	async fn publish(
		&self,
		topic: &str,
		payload: Vec<u8>,
		qos: QoS,
		retain: bool,
	) -> Result<(), SinkError>;
}
