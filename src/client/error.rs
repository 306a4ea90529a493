use thiserror::Error;

use crate::codec::EncodeError;
use crate::routing::RouteError;
use crate::topic::TopicFilterError;
use crate::transport::SinkError;

/// Errors surfaced by [`DispatchClient`] operations.
///
/// [`DispatchClient`]: crate::client::DispatchClient
#[derive(Error, Debug)]
pub enum ClientError {
	/// Registration attempted after `start()`; routes are fixed once
	/// the dispatcher is running.
	#[error("Client already started; routes are fixed after start()")]
	AlreadyStarted,

	/// `stop()` called on a client that was never started.
	#[error("Client was never started")]
	NotStarted,

	/// Invalid topic filter at registration.
	#[error(transparent)]
	Filter(#[from] TopicFilterError),

	/// Invalid concrete topic passed to `publish`.
	#[error("Invalid publish topic '{topic}': {reason}")]
	InvalidTopic {
		topic: String,
		reason: &'static str,
	},

	/// Route registration failure.
	#[error(transparent)]
	Route(#[from] RouteError),

	/// Synchronous encoding failure during `publish`.
	#[error(transparent)]
	Encode(#[from] EncodeError),

	/// The message sink rejected an outbound publish.
	#[error(transparent)]
	Sink(#[from] SinkError),

	/// The dispatcher task failed to join.
	#[error("Dispatcher task failed: {0}")]
	Dispatcher(String),
}

impl ClientError {
	/// Creates a new InvalidTopic error
	pub fn invalid_topic(
		topic: impl Into<String>,
		reason: &'static str,
	) -> Self {
		Self::InvalidTopic {
			topic: topic.into(),
			reason,
		}
	}
}
