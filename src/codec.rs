//! Payload codec boundary
//!
//! Converts between raw payload bytes and typed in-memory messages.
//! Exactly one codec is bound per payload type at registration time;
//! the dispatcher looks the binding up by payload-type identifier when
//! decoding inbound messages and encoding handler responses.

pub mod error;
pub mod message_codec;
pub mod registry;

pub use error::{DecodeError, EncodeError};
pub use message_codec::{BincodeCodec, MessageCodec};
#[cfg(feature = "json")]
pub use message_codec::JsonCodec;
pub use registry::{CodecRegistry, PayloadType};
