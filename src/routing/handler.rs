use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use arcstr::ArcStr;
use thiserror::Error;

use crate::codec::registry::AnyPayload;
use crate::message::QoS;
use crate::topic::TopicPath;

/// Boxed future returned by handler invocations.
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A raw message paired with its decoded, typed payload.
///
/// Owned by the handler for the duration of one invocation; the
/// dispatcher does not retain it afterwards.
#[derive(Debug)]
pub struct DecodedMessage<T> {
	/// Concrete topic the message arrived on.
	pub topic: TopicPath,
	/// Decoded payload.
	pub payload: T,
	/// Delivery guarantee the message arrived with.
	pub qos: QoS,
	/// Whether the message was retained by the broker.
	pub retain: bool,
}

/// An outbound message a handler may return.
///
/// The dispatcher encodes the payload with the codec bound to the
/// originating route's payload type and forwards it to the message
/// sink on the handler's behalf.
#[derive(Debug)]
pub struct Response<T> {
	/// Concrete topic to publish on.
	pub topic: ArcStr,
	/// Typed payload; same payload type as the originating route.
	pub payload: T,
	/// QoS to publish with.
	pub qos: QoS,
	/// Retain flag to publish with.
	pub retain: bool,
}

impl<T> Response<T> {
	/// Creates a response with default metadata (QoS 1, not retained).
	pub fn new(topic: impl Into<ArcStr>, payload: T) -> Self {
		Self {
			topic: topic.into(),
			payload,
			qos: QoS::AtLeastOnce,
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

/// Failure raised by a handler invocation.
///
/// Contained to that (message, handler) pair: logged and counted,
/// never propagated to sibling handlers or the consumption loop.
#[derive(Error, Debug, Clone)]
#[error("Handler failed: {message}")]
pub struct HandlerError {
	message: String,
}

impl HandlerError {
	/// Creates a handler error with the given description.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

impl From<String> for HandlerError {
	fn from(message: String) -> Self {
		Self::new(message)
	}
}

impl From<&str> for HandlerError {
	fn from(message: &str) -> Self {
		Self::new(message)
	}
}

/// Outcome of one handler invocation: success optionally carrying an
/// outbound message, or a contained failure.
pub type HandlerOutcome<T> = Result<Option<Response<T>>, HandlerError>;

/// A typed message handler for one route.
///
/// Implemented for any `Fn(DecodedMessage<T>) -> impl Future` closure,
/// which covers the usual registration style:
///
/// ```rust
/// use mqtt_dispatch::{DecodedMessage, HandlerOutcome};
///
/// async fn on_reading(message: DecodedMessage<u32>) -> HandlerOutcome<u32> {
/// 	println!("{} -> {}", message.topic, message.payload);
/// 	Ok(None)
/// }
/// ```
pub trait RouteHandler<T>: Send + Sync + 'static {
	/// Handles one decoded message.
	fn call(&self, message: DecodedMessage<T>)
	-> BoxFuture<HandlerOutcome<T>>;
}

impl<T, F, Fut> RouteHandler<T> for F
where
	F: Fn(DecodedMessage<T>) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = HandlerOutcome<T>> + Send + 'static,
{
	fn call(
		&self,
		message: DecodedMessage<T>,
	) -> BoxFuture<HandlerOutcome<T>> {
		Box::pin((self)(message))
	}
}

/// A handler response with its payload type erased, ready for codec
/// lookup by the dispatcher.
pub(crate) struct ErasedResponse {
	pub topic: ArcStr,
	pub payload: AnyPayload,
	pub qos: QoS,
	pub retain: bool,
}

/// Object-safe handler view stored in the route table.
pub(crate) trait ErasedHandler: Send + Sync {
	fn invoke(
		&self,
		topic: TopicPath,
		payload: AnyPayload,
		qos: QoS,
		retain: bool,
	) -> BoxFuture<Result<Option<ErasedResponse>, HandlerError>>;
}

pub(crate) struct TypedHandler<T, H> {
	handler: H,
	_payload: PhantomData<fn() -> T>,
}

impl<T, H> TypedHandler<T, H>
where
	T: Send + Sync + 'static,
	H: RouteHandler<T>,
{
	pub(crate) fn new(handler: H) -> Self {
		Self {
			handler,
			_payload: PhantomData,
		}
	}
}

impl<T, H> ErasedHandler for TypedHandler<T, H>
where
	T: Send + Sync + 'static,
	H: RouteHandler<T>,
{
	fn invoke(
		&self,
		topic: TopicPath,
		payload: AnyPayload,
		qos: QoS,
		retain: bool,
	) -> BoxFuture<Result<Option<ErasedResponse>, HandlerError>> {
		let payload = match payload.downcast::<T>() {
			| Ok(payload) => *payload,
			| Err(_) => {
				// Decoding used the codec bound to this route's
				// payload type, so the downcast cannot fail unless
				// the registry was corrupted.
				return Box::pin(std::future::ready(Err(
					HandlerError::new("decoded payload type mismatch"),
				)));
			}
		};
		let future = self.handler.call(DecodedMessage {
			topic,
			payload,
			qos,
			retain,
		});
		Box::pin(async move {
			future.await.map(|response| {
				response.map(|r| ErasedResponse {
					topic: r.topic,
					payload: Box::new(r.payload) as AnyPayload,
					qos: r.qos,
					retain: r.retain,
				})
			})
		})
	}
}
