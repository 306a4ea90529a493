#![allow(clippy::missing_docs_in_private_items)]

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::error::{DecodeError, EncodeError};
use super::message_codec::MessageCodec;

/// Identifier of a payload type, used as the route's payload-type
/// identifier and as the codec-binding key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayloadType {
	id: TypeId,
	name: &'static str,
}

impl PayloadType {
	/// The payload-type identifier of `T`.
	pub fn of<T: 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: type_name::<T>(),
		}
	}

	/// Full type name, for diagnostics.
	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl fmt::Display for PayloadType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.name)
	}
}

/// A decoded payload with its concrete type erased.
pub(crate) type AnyPayload = Box<dyn Any + Send + Sync>;

/// Object-safe codec view used by the dispatcher.
pub(crate) trait ErasedCodec: Send + Sync {
	fn payload_type(&self) -> PayloadType;

	fn decode_erased(
		&self,
		topic: &str,
		bytes: &[u8],
	) -> Result<AnyPayload, DecodeError>;

	fn encode_erased(
		&self,
		topic: &str,
		value: &dyn Any,
	) -> Result<Vec<u8>, EncodeError>;
}

struct TypedCodec<T, C> {
	codec: C,
	_payload: PhantomData<fn() -> T>,
}

impl<T, C> ErasedCodec for TypedCodec<T, C>
where
	T: Send + Sync + 'static,
	C: MessageCodec<T>,
{
	fn payload_type(&self) -> PayloadType {
		PayloadType::of::<T>()
	}

	fn decode_erased(
		&self,
		topic: &str,
		bytes: &[u8],
	) -> Result<AnyPayload, DecodeError> {
		self.codec
			.decode(bytes)
			.map(|value| Box::new(value) as AnyPayload)
			.map_err(|err| {
				DecodeError::new(
					topic,
					bytes.len(),
					PayloadType::of::<T>(),
					err,
				)
			})
	}

	fn encode_erased(
		&self,
		topic: &str,
		value: &dyn Any,
	) -> Result<Vec<u8>, EncodeError> {
		let value = value.downcast_ref::<T>().ok_or_else(|| {
			EncodeError::payload_type_mismatch(topic, PayloadType::of::<T>())
		})?;
		self.codec.encode(value).map_err(|err| {
			EncodeError::codec(topic, PayloadType::of::<T>(), err)
		})
	}
}

/// Codec bindings keyed by payload type.
///
/// Populated during the registration phase, then frozen behind an
/// `Arc` when the dispatcher starts; lookups on the hot path take no
/// lock. Binding the same payload type again is a no-op, so several
/// routes may share one payload type.
#[derive(Default)]
pub struct CodecRegistry {
	codecs: HashMap<PayloadType, Arc<dyn ErasedCodec>>,
}

impl CodecRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Binds `codec` as the codec for payload type `T`.
	///
	/// The first binding for a payload type wins; later bindings for
	/// the same type are ignored.
	pub fn bind<T, C>(&mut self, codec: C)
	where
		T: Send + Sync + 'static,
		C: MessageCodec<T>,
	{
		self.codecs
			.entry(PayloadType::of::<T>())
			.or_insert_with(|| {
				Arc::new(TypedCodec::<T, C> {
					codec,
					_payload: PhantomData,
				})
			});
	}

	/// Looks up the codec bound to `payload_type`.
	pub(crate) fn get(
		&self,
		payload_type: PayloadType,
	) -> Option<&Arc<dyn ErasedCodec>> {
		self.codecs.get(&payload_type)
	}

	/// Number of bound payload types.
	pub fn len(&self) -> usize {
		self.codecs.len()
	}

	/// True if no payload type is bound.
	pub fn is_empty(&self) -> bool {
		self.codecs.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use bincode::{Decode, Encode};

	use super::*;
	use crate::codec::BincodeCodec;

	#[derive(Encode, Decode, Debug, PartialEq)]
	struct Ping {
		seq: u32,
	}

	#[test]
	fn erased_round_trip() {
		let mut registry = CodecRegistry::new();
		registry.bind::<Ping, _>(BincodeCodec::new());

		let codec = registry.get(PayloadType::of::<Ping>()).unwrap();
		let bytes = codec
			.encode_erased("test/ping", &Ping { seq: 7 })
			.unwrap();
		let decoded = codec.decode_erased("test/ping", &bytes).unwrap();
		assert_eq!(decoded.downcast_ref::<Ping>(), Some(&Ping { seq: 7 }));
	}

	#[test]
	fn decode_error_carries_topic_and_length() {
		let mut registry = CodecRegistry::new();
		registry.bind::<Ping, _>(BincodeCodec::new());

		let codec = registry.get(PayloadType::of::<Ping>()).unwrap();
		let err = codec
			.decode_erased("test/ping", &[0xff, 0xff, 0xff])
			.unwrap_err();
		assert_eq!(err.topic(), "test/ping");
		assert_eq!(err.payload_len(), 3);
		assert_eq!(err.payload_type(), PayloadType::of::<Ping>());
	}

	#[test]
	fn encode_rejects_wrong_payload_type() {
		let mut registry = CodecRegistry::new();
		registry.bind::<Ping, _>(BincodeCodec::new());

		let codec = registry.get(PayloadType::of::<Ping>()).unwrap();
		let err = codec.encode_erased("test/ping", &0u64).unwrap_err();
		assert!(matches!(err, EncodeError::PayloadTypeMismatch { .. }));
	}

	#[test]
	fn rebinding_same_type_is_noop() {
		let mut registry = CodecRegistry::new();
		registry.bind::<Ping, _>(BincodeCodec::new());
		registry.bind::<Ping, _>(BincodeCodec::new());
		assert_eq!(registry.len(), 1);
	}
}
