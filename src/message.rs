//! Inbound message representation and delivery metadata.

use arcstr::ArcStr;
use bytes::Bytes;

/// Quality of Service levels for published and subscribed messages.
///
/// Mirrors the three MQTT delivery guarantees. The dispatch core never
/// interprets these levels itself; they are carried through to the
/// message sink and exposed to handlers as delivery metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QoS {
	/// The message is delivered at most once, or not at all.
	#[default]
	AtMostOnce,
	/// The message is delivered at least once.
	AtLeastOnce,
	/// The message is delivered exactly once.
	ExactlyOnce,
}

impl QoS {
	/// Numeric MQTT QoS level (0, 1 or 2).
	pub fn as_u8(self) -> u8 {
		match self {
			| QoS::AtMostOnce => 0,
			| QoS::AtLeastOnce => 1,
			| QoS::ExactlyOnce => 2,
		}
	}

	/// Converts a numeric MQTT QoS level, if valid.
	pub fn from_u8(value: u8) -> Option<Self> {
		match value {
			| 0 => Some(QoS::AtMostOnce),
			| 1 => Some(QoS::AtLeastOnce),
			| 2 => Some(QoS::ExactlyOnce),
			| _ => None,
		}
	}
}

impl std::fmt::Display for QoS {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_u8())
	}
}

/// A raw inbound message as produced by a [`MessageSource`].
///
/// The topic is always concrete (no wildcards). The payload is untyped
/// bytes; decoding happens per matching route with the codec bound to
/// that route's payload type. A `RawMessage` is consumed once by the
/// dispatcher and not retained afterwards.
///
/// [`MessageSource`]: crate::transport::MessageSource
#[derive(Debug, Clone)]
pub struct RawMessage {
	/// Concrete topic the message was published on.
	pub topic: ArcStr,
	/// Encoded payload bytes.
	pub payload: Bytes,
	/// Delivery guarantee the message arrived with.
	pub qos: QoS,
	/// Whether the broker flagged the message as retained.
	pub retain: bool,
}

impl RawMessage {
	/// Creates a message with default metadata (QoS 0, not retained).
	pub fn new(topic: impl Into<ArcStr>, payload: impl Into<Bytes>) -> Self {
		Self {
			topic: topic.into(),
			payload: payload.into(),
			qos: QoS::default(),
			retain: false,
		}
	}

	/// Sets the QoS level.
	pub fn with_qos(mut self, qos: QoS) -> Self {
		self.qos = qos;
		self
	}

	/// Sets the retain flag.
	pub fn with_retain(mut self, retain: bool) -> Self {
		self.retain = retain;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn qos_u8_round_trip() {
		for qos in [QoS::AtMostOnce, QoS::AtLeastOnce, QoS::ExactlyOnce] {
			assert_eq!(QoS::from_u8(qos.as_u8()), Some(qos));
		}
		assert_eq!(QoS::from_u8(3), None);
	}

	#[test]
	fn raw_message_builder_defaults() {
		let msg = RawMessage::new("sensors/kitchen", vec![1, 2, 3]);
		assert_eq!(msg.qos, QoS::AtMostOnce);
		assert!(!msg.retain);

		let msg = msg.with_qos(QoS::ExactlyOnce).with_retain(true);
		assert_eq!(msg.qos, QoS::ExactlyOnce);
		assert!(msg.retain);
	}
}
