use std::sync::{Arc, Mutex};

use arcstr::ArcStr;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::config::DispatchConfig;
use super::error::ClientError;
use crate::codec::{CodecRegistry, EncodeError, MessageCodec, PayloadType};
use crate::dispatch::{
	Dispatcher, DispatcherState, DispatchStats, StatsHandle, StopReason,
};
use crate::message::QoS;
use crate::routing::{RouteHandler, RouteTable};
use crate::topic::TopicFilter;
use crate::transport::{MessageSink, MessageSource};

/// Registration-phase state, consumed by `start()`.
struct Registration<S> {
	source: S,
	routes: RouteTable,
	codecs: CodecRegistry,
}

struct Inner<S> {
	registration: Option<Registration<S>>,
	run: Option<JoinHandle<StopReason>>,
	stop_reason: Option<StopReason>,
}

/// Typed dispatch client over an abstract message source and sink.
///
/// `S` is the message source; `F` the codec family bound per payload
/// type at registration (bincode by default). Lifecycle: register
/// routes while idle, `start()` once, publish at any time, `stop()`
/// to drain and shut down.
///
/// ```rust,no_run
/// use mqtt_dispatch::transport::memory;
/// use mqtt_dispatch::{
/// 	BincodeCodec, DecodedMessage, DispatchClient, DispatchConfig,
/// 	HandlerOutcome,
/// };
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// async fn on_reading(msg: DecodedMessage<f64>) -> HandlerOutcome<f64> {
/// 	println!("{} -> {}", msg.topic, msg.payload);
/// 	Ok(None)
/// }
///
/// let (_inbound, source) = memory::channel_source(16);
/// let (sink, _outbound) = memory::channel_sink();
/// let client = DispatchClient::<_, BincodeCodec>::new(
/// 	source,
/// 	sink,
/// 	DispatchConfig::new(),
/// );
///
/// client.route::<f64, _>("sensors/+/temperature", on_reading)?;
/// client.start()?;
/// client.publish("sensors/kitchen/temperature", &23.5).await?;
/// client.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct DispatchClient<S, F = crate::codec::BincodeCodec> {
	codec_family: F,
	sink: Arc<dyn MessageSink>,
	config: DispatchConfig,
	inner: Mutex<Inner<S>>,
	cancel: CancellationToken,
	state_tx: watch::Sender<DispatcherState>,
	state_rx: watch::Receiver<DispatcherState>,
	stats: Arc<StatsHandle>,
}

impl<S, F> DispatchClient<S, F>
where
	S: MessageSource,
	F: Default + Clone + Send + Sync + 'static,
{
	/// Creates a client over the given source and sink.
	///
	/// The client starts in the `Idle` state; no message is consumed
	/// until [`DispatchClient::start`] is called.
	pub fn new(
		source: S,
		sink: impl MessageSink,
		config: DispatchConfig,
	) -> Self {
		let (state_tx, state_rx) = watch::channel(DispatcherState::Idle);
		Self {
			codec_family: F::default(),
			sink: Arc::new(sink),
			config,
			inner: Mutex::new(Inner {
				registration: Some(Registration {
					source,
					routes: RouteTable::new(),
					codecs: CodecRegistry::new(),
				}),
				run: None,
				stop_reason: None,
			}),
			cancel: CancellationToken::new(),
			state_tx,
			state_rx,
			stats: Arc::new(StatsHandle::default()),
		}
	}

	/// Registers `handler` for topics matching `filter`, with
	/// payloads decoded as `T` by this client's codec family.
	///
	/// Usable only before [`DispatchClient::start`]; afterwards fails
	/// with [`ClientError::AlreadyStarted`] and leaves the route
	/// table unchanged.
	pub fn route<T, H>(
		&self,
		filter: impl Into<ArcStr>,
		handler: H,
	) -> Result<(), ClientError>
	where
		T: Send + Sync + 'static,
		F: MessageCodec<T>,
		H: RouteHandler<T>,
	{
		let mut inner = self.inner.lock().unwrap();
		let Some(registration) = inner.registration.as_mut() else {
			return Err(ClientError::AlreadyStarted);
		};
		let filter = TopicFilter::parse(filter)?;
		registration.routes.register::<T, H>(filter, handler)?;
		registration.codecs.bind::<T, F>(self.codec_family.clone());
		Ok(())
	}

	/// Transitions the dispatcher from `Idle` to `Running` and begins
	/// consuming from the message source.
	///
	/// Freezes the route table and codec registry; fails with
	/// [`ClientError::AlreadyStarted`] if called twice.
	pub fn start(&self) -> Result<(), ClientError> {
		let mut inner = self.inner.lock().unwrap();
		let registration = inner
			.registration
			.take()
			.ok_or(ClientError::AlreadyStarted)?;
		info!(
			routes = registration.routes.len(),
			max_in_flight = self.config.max_in_flight,
			"Starting dispatcher"
		);
		let dispatcher = Dispatcher::new(
			registration.source,
			Arc::new(registration.routes),
			Arc::new(registration.codecs),
			Arc::clone(&self.sink),
			self.config.max_in_flight,
			self.cancel.clone(),
			self.state_tx.clone(),
			Arc::clone(&self.stats),
		);
		inner.run = Some(tokio::spawn(dispatcher.run()));
		Ok(())
	}

	/// Publishes `value` on `topic` with QoS 1, not retained.
	pub async fn publish<T>(
		&self,
		topic: impl Into<ArcStr>,
		value: &T,
	) -> Result<(), ClientError>
	where
		T: Send + Sync + 'static,
		F: MessageCodec<T>,
	{
		self.publish_with(topic, value, QoS::AtLeastOnce, false).await
	}

	/// Publishes `value` on `topic` with explicit delivery metadata.
	///
	/// Encoding happens synchronously via the codec bound to `T`;
	/// failures surface to the caller before anything reaches the
	/// sink. Legal in any lifecycle state.
	pub async fn publish_with<T>(
		&self,
		topic: impl Into<ArcStr>,
		value: &T,
		qos: QoS,
		retain: bool,
	) -> Result<(), ClientError>
	where
		T: Send + Sync + 'static,
		F: MessageCodec<T>,
	{
		let topic = topic.into();
		validate_publish_topic(&topic)?;
		let payload = self.codec_family.encode(value).map_err(|err| {
			EncodeError::codec(topic.as_str(), PayloadType::of::<T>(), err)
		})?;
		self.sink.publish(&topic, payload, qos, retain).await?;
		Ok(())
	}

	/// Stops the dispatcher: `Running` -> `Draining` -> `Stopped`.
	///
	/// No new messages are consumed, all in-flight handler
	/// invocations are awaited (no hard timeout), then the stop
	/// reason is returned. Idempotent once stopped.
	pub async fn stop(&self) -> Result<StopReason, ClientError> {
		let handle = {
			let mut inner = self.inner.lock().unwrap();
			match inner.run.take() {
				| Some(handle) => handle,
				| None => {
					if let Some(reason) = inner.stop_reason {
						return Ok(reason);
					}
					return Err(ClientError::NotStarted);
				}
			}
		};
		self.cancel.cancel();
		let reason = handle
			.await
			.map_err(|err| ClientError::Dispatcher(err.to_string()))?;
		self.inner.lock().unwrap().stop_reason = Some(reason);
		Ok(reason)
	}

	/// Current dispatcher lifecycle state.
	pub fn state(&self) -> DispatcherState {
		*self.state_rx.borrow()
	}

	/// Waits until the dispatcher reaches `Stopped`, whether through
	/// [`DispatchClient::stop`] or a closed message source.
	pub async fn stopped(&self) {
		let mut state_rx = self.state_rx.clone();
		// The sender half lives in this client, so wait_for can only
		// fail after the client itself is gone.
		let _ = state_rx
			.wait_for(|state| *state == DispatcherState::Stopped)
			.await;
	}

	/// Snapshot of the dispatch counters.
	pub fn stats(&self) -> DispatchStats {
		self.stats.snapshot()
	}
}

/// Publish topics must be concrete: non-empty, within the MQTT length
/// limit and free of wildcard or null characters.
fn validate_publish_topic(topic: &str) -> Result<(), ClientError> {
	if topic.is_empty() || topic.len() > 65535 {
		return Err(ClientError::invalid_topic(
			topic,
			"topic is empty or too long",
		));
	}
	if topic.chars().any(|c| matches!(c, '\0' | '#' | '+')) {
		return Err(ClientError::invalid_topic(
			topic,
			"topic contains wildcard or null characters",
		));
	}
	Ok(())
}
