use std::fmt::{Debug, Display};

use bincode::{Decode, Encode};

/// Encode/decode pair bound to one payload type.
///
/// Implementations are stateless families: one `MessageCodec` value
/// serves every payload type it supports, and the client facade binds
/// it per payload type at route registration. Implement this trait to
/// plug in a custom wire format:
///
/// ```rust
/// use mqtt_dispatch::MessageCodec;
///
/// #[derive(Clone, Default)]
/// struct CsvCodec;
///
/// impl MessageCodec<(u32, u32)> for CsvCodec {
/// 	type EncodeError = std::fmt::Error;
/// 	type DecodeError = std::num::ParseIntError;
///
/// 	fn encode(
/// 		&self,
/// 		value: &(u32, u32),
/// 	) -> Result<Vec<u8>, Self::EncodeError> {
/// 		Ok(format!("{},{}", value.0, value.1).into_bytes())
/// 	}
///
/// 	fn decode(
/// 		&self,
/// 		bytes: &[u8],
/// 	) -> Result<(u32, u32), Self::DecodeError> {
/// 		let text = String::from_utf8_lossy(bytes);
/// 		let mut parts = text.splitn(2, ',');
/// 		let a = parts.next().unwrap_or("0").trim().parse()?;
/// 		let b = parts.next().unwrap_or("0").trim().parse()?;
/// 		Ok((a, b))
/// 	}
/// }
/// ```
pub trait MessageCodec<T>: Default + Clone + Send + Sync + 'static {
	/// Failure converting a typed value into bytes.
	type EncodeError: Debug + Display + Send + Sync + 'static;
	/// Failure converting bytes back into a typed value.
	type DecodeError: Debug + Display + Send + Sync + 'static;

	/// Encodes a typed value into payload bytes.
	fn encode(&self, value: &T) -> Result<Vec<u8>, Self::EncodeError>;
	/// Decodes payload bytes into a typed value.
	fn decode(&self, bytes: &[u8]) -> Result<T, Self::DecodeError>;
}

/// Default codec using `bincode` binary encoding.
#[derive(Clone, Default)]
pub struct BincodeCodec {
	config: bincode::config::Configuration,
}

impl BincodeCodec {
	/// Creates a codec with the default bincode configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a codec with a custom bincode configuration.
	pub fn with_config(config: bincode::config::Configuration) -> Self {
		Self { config }
	}
}

impl<T> MessageCodec<T> for BincodeCodec
where T: Encode + Decode<()> + 'static
{
	type EncodeError = bincode::error::EncodeError;
	type DecodeError = bincode::error::DecodeError;

	fn encode(&self, value: &T) -> Result<Vec<u8>, Self::EncodeError> {
		bincode::encode_to_vec(value, self.config)
	}

	fn decode(&self, bytes: &[u8]) -> Result<T, Self::DecodeError> {
		bincode::decode_from_slice(bytes, self.config)
			.map(|(value, _)| value)
	}
}

/// JSON codec backed by `serde_json`.
#[cfg(feature = "json")]
#[derive(Clone, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl<T> MessageCodec<T> for JsonCodec
where T: serde::Serialize + serde::de::DeserializeOwned + 'static
{
	type EncodeError = serde_json::Error;
	type DecodeError = serde_json::Error;

	fn encode(&self, value: &T) -> Result<Vec<u8>, Self::EncodeError> {
		serde_json::to_vec(value)
	}

	fn decode(&self, bytes: &[u8]) -> Result<T, Self::DecodeError> {
		serde_json::from_slice(bytes)
	}
}
