use thiserror::Error;

use super::registry::PayloadType;

/// Failure decoding an inbound payload for one route.
///
/// Recovered per message: reported as a failed delivery for that
/// single (message, route) pair while the dispatcher keeps running.
#[derive(Error, Debug, Clone)]
#[error(
	"Failed to decode {payload_type} payload on topic '{topic}' \
	 ({payload_len} bytes): {reason}"
)]
pub struct DecodeError {
	topic: String,
	payload_len: usize,
	payload_type: PayloadType,
	reason: String,
}

impl DecodeError {
	/// Creates a decode error from the underlying codec failure.
	pub fn new(
		topic: impl Into<String>,
		payload_len: usize,
		payload_type: PayloadType,
		reason: impl std::fmt::Display,
	) -> Self {
		Self {
			topic: topic.into(),
			payload_len,
			payload_type,
			reason: reason.to_string(),
		}
	}

	/// Topic the undecodable message arrived on.
	pub fn topic(&self) -> &str {
		&self.topic
	}

	/// Length in bytes of the raw payload.
	pub fn payload_len(&self) -> usize {
		self.payload_len
	}

	/// Payload type the bytes were expected to decode into.
	pub fn payload_type(&self) -> PayloadType {
		self.payload_type
	}
}

/// Failure encoding a typed value for publication.
///
/// Encoding failures are a programming-error category and are
/// surfaced synchronously to the caller of `publish`.
#[derive(Error, Debug, Clone)]
pub enum EncodeError {
	/// The bound codec rejected the value.
	#[error(
		"Failed to encode {payload_type} payload for topic '{topic}': \
		 {reason}"
	)]
	Codec {
		topic: String,
		payload_type: PayloadType,
		reason: String,
	},

	/// No codec binding exists for the payload type.
	#[error("No codec bound for payload type {payload_type}")]
	UnboundPayloadType { payload_type: PayloadType },

	/// The value does not have the payload type declared at binding.
	#[error("Payload for topic '{topic}' is not a {payload_type}")]
	PayloadTypeMismatch {
		topic: String,
		payload_type: PayloadType,
	},
}

impl EncodeError {
	/// Creates a codec-failure error.
	pub fn codec(
		topic: impl Into<String>,
		payload_type: PayloadType,
		reason: impl std::fmt::Display,
	) -> Self {
		Self::Codec {
			topic: topic.into(),
			payload_type,
			reason: reason.to_string(),
		}
	}

	/// Creates a type-mismatch error.
	pub fn payload_type_mismatch(
		topic: impl Into<String>,
		payload_type: PayloadType,
	) -> Self {
		Self::PayloadTypeMismatch {
			topic: topic.into(),
			payload_type,
		}
	}
}
