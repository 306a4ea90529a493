#![allow(clippy::missing_docs_in_private_items)]

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::stats::StatsHandle;
use crate::codec::CodecRegistry;
use crate::codec::registry::ErasedCodec;
use crate::message::{QoS, RawMessage};
use crate::routing::{ErasedHandler, RouteTable};
use crate::topic::TopicPath;
use crate::transport::{MessageSink, MessageSource};

/// Lifecycle state of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
	/// Constructed, not consuming yet.
	Idle,
	/// Actively consuming from the message source.
	Running,
	/// Stop requested or source closed; finishing in-flight handler
	/// invocations, no new intake.
	Draining,
	/// Terminal; all in-flight invocations have completed.
	Stopped,
}

impl fmt::Display for DispatcherState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			| DispatcherState::Idle => "idle",
			| DispatcherState::Running => "running",
			| DispatcherState::Draining => "draining",
			| DispatcherState::Stopped => "stopped",
		};
		write!(f, "{name}")
	}
}

/// Why the dispatcher stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
	/// `stop()` was requested and the drain completed.
	Drained,
	/// The message source closed (connection loss or shutdown of the
	/// underlying client).
	SourceClosed,
}

impl fmt::Display for StopReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			| StopReason::Drained => write!(f, "drained"),
			| StopReason::SourceClosed => write!(f, "source closed"),
		}
	}
}

/// The consumption loop plus its bounded handler pool.
///
/// At most `max_in_flight` handler invocations run simultaneously,
/// across sibling routes of one message and across distinct messages
/// alike. Intake suspends while the pool is full, which is the
/// dispatcher's backpressure contract towards the source.
pub(crate) struct Dispatcher<S> {
	source: S,
	routes: Arc<RouteTable>,
	codecs: Arc<CodecRegistry>,
	sink: Arc<dyn MessageSink>,
	semaphore: Arc<Semaphore>,
	cancel: CancellationToken,
	state_tx: watch::Sender<DispatcherState>,
	stats: Arc<StatsHandle>,
	tasks: JoinSet<()>,
}

impl<S: MessageSource> Dispatcher<S> {
	#[allow(clippy::too_many_arguments)]
	pub(crate) fn new(
		source: S,
		routes: Arc<RouteTable>,
		codecs: Arc<CodecRegistry>,
		sink: Arc<dyn MessageSink>,
		max_in_flight: usize,
		cancel: CancellationToken,
		state_tx: watch::Sender<DispatcherState>,
		stats: Arc<StatsHandle>,
	) -> Self {
		Self {
			source,
			routes,
			codecs,
			sink,
			semaphore: Arc::new(Semaphore::new(max_in_flight.max(1))),
			cancel,
			state_tx,
			stats,
			tasks: JoinSet::new(),
		}
	}

	/// Runs until stop is requested or the source closes, then drains
	/// all in-flight handler invocations.
	pub(crate) async fn run(mut self) -> StopReason {
		self.state_tx.send_replace(DispatcherState::Running);
		info!(routes = self.routes.len(), "Dispatcher running");

		let reason = loop {
			tokio::select! {
				_ = self.cancel.cancelled() => {
					info!("Dispatcher stop requested");
					break StopReason::Drained;
				}
				message = self.source.recv() => {
					match message {
						| Some(message) => self.dispatch(message).await,
						| None => {
							info!("Message source closed");
							break StopReason::SourceClosed;
						}
					}
				}
			}
		};

		self.drain().await;
		reason
	}

	async fn dispatch(&mut self, message: RawMessage) {
		// Reap finished invocations so the join set does not grow
		// with the message volume.
		while let Some(result) = self.tasks.try_join_next() {
			self.record_task_result(result);
		}

		let topic = TopicPath::new(message.topic.clone());
		let matched = self.routes.resolve(&topic);
		if matched.is_empty() {
			self.stats.record_unrouted();
			debug!(topic = %topic, "No route matched, message dropped");
			return;
		}
		debug!(
			topic = %topic,
			matched = matched.len(),
			payload_size = message.payload.len(),
			"Dispatching message"
		);

		// Snapshot handler/codec pairs so the route-table borrow ends
		// before awaiting permits.
		let invocations: Vec<_> = matched
			.into_iter()
			.map(|route| {
				(route.handler(), self.codecs.get(route.payload_type()).cloned())
			})
			.collect();

		for (handler, codec) in invocations {
			let Some(codec) = codec else {
				// Registration binds a codec for every payload type,
				// so a missing binding means a corrupted registry.
				error!(topic = %topic, "No codec bound for matched route");
				self.stats.record_decode_failure();
				continue;
			};

			// Backpressure: wait for a free handler slot before
			// pulling further work.
			let permit = Arc::clone(&self.semaphore)
				.acquire_owned()
				.await
				.expect("dispatcher semaphore is never closed");

			let invocation = HandlerInvocation {
				handler,
				codec,
				sink: Arc::clone(&self.sink),
				stats: Arc::clone(&self.stats),
				topic: topic.clone(),
				payload: message.payload.clone(),
				qos: message.qos,
				retain: message.retain,
			};
			self.tasks.spawn(async move {
				let _permit = permit;
				invocation.run().await;
			});
		}
	}

	async fn drain(&mut self) {
		self.state_tx.send_replace(DispatcherState::Draining);
		let in_flight = self.tasks.len();
		if in_flight > 0 {
			info!(in_flight, "Draining in-flight handler invocations");
		}
		while let Some(result) = self.tasks.join_next().await {
			self.record_task_result(result);
		}
		self.state_tx.send_replace(DispatcherState::Stopped);
		info!("Dispatcher stopped");
	}

	fn record_task_result(
		&self,
		result: Result<(), tokio::task::JoinError>,
	) {
		if let Err(err) = result {
			if err.is_panic() {
				self.stats.record_handler_failure();
				error!(error = %err, "Handler task panicked");
			}
		}
	}
}

/// One isolated handler invocation: decode, invoke, forward any
/// response. Failures are contained here and never reach siblings or
/// the consumption loop.
struct HandlerInvocation {
	handler: Arc<dyn ErasedHandler>,
	codec: Arc<dyn ErasedCodec>,
	sink: Arc<dyn MessageSink>,
	stats: Arc<StatsHandle>,
	topic: TopicPath,
	payload: Bytes,
	qos: QoS,
	retain: bool,
}

impl HandlerInvocation {
	async fn run(self) {
		let decoded = match self
			.codec
			.decode_erased(self.topic.path().as_str(), &self.payload)
		{
			| Ok(decoded) => decoded,
			| Err(err) => {
				self.stats.record_decode_failure();
				warn!(
					topic = %self.topic,
					payload_len = err.payload_len(),
					error = %err,
					"Failed to decode inbound payload"
				);
				return;
			}
		};

		let outcome = self
			.handler
			.invoke(self.topic.clone(), decoded, self.qos, self.retain)
			.await;
		match outcome {
			| Ok(None) => {
				self.stats.record_delivered();
			}
			| Ok(Some(response)) => {
				self.stats.record_delivered();
				self.forward_response(response).await;
			}
			| Err(err) => {
				self.stats.record_handler_failure();
				warn!(
					topic = %self.topic,
					error = %err,
					"Handler failed"
				);
			}
		}
	}

	/// Encodes a handler response with the route's own codec binding
	/// and forwards it to the message sink.
	async fn forward_response(
		&self,
		response: crate::routing::ErasedResponse,
	) {
		let payload = match self
			.codec
			.encode_erased(&response.topic, response.payload.as_ref())
		{
			| Ok(payload) => payload,
			| Err(err) => {
				self.stats.record_handler_failure();
				error!(
					topic = %response.topic,
					error = %err,
					"Failed to encode handler response"
				);
				return;
			}
		};
		if let Err(err) = self
			.sink
			.publish(&response.topic, payload, response.qos, response.retain)
			.await
		{
			self.stats.record_handler_failure();
			error!(
				topic = %response.topic,
				error = %err,
				"Failed to publish handler response"
			);
		}
	}
}
