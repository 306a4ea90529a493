//! `rumqttc` transport adapter
//!
//! Satisfies the [`MessageSource`]/[`MessageSink`] seams with a real
//! MQTT connection driven by `rumqttc`. The event loop runs in a
//! spawned task and forwards inbound publishes into the source
//! channel; it terminates when a Disconnect packet is seen in either
//! direction or after too many consecutive poll errors.

use std::time::Duration;

use arcstr::ArcStr;
use async_trait::async_trait;
use rumqttc::Event::{Incoming, Outgoing};
use rumqttc::Packet::{Disconnect, Publish};
use rumqttc::{AsyncClient, EventLoop, MqttOptions};
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, error, info, warn};

use super::{MessageSink, MessageSource, SinkError};
use crate::message::{QoS, RawMessage};

/// Abort after this many poll errors in a row.
const MAX_CONSECUTIVE_ERRORS: u32 = 10;
/// First retry delay after a poll error.
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);
/// Upper bound for the exponential retry delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Message source backed by a `rumqttc` event loop.
pub struct MqttSource {
	receiver: mpsc::Receiver<RawMessage>,
}

/// Message sink backed by a `rumqttc` client.
#[derive(Clone)]
pub struct MqttSink {
	client: AsyncClient,
}

/// Connects to a broker and returns the sink/source pair.
///
/// Topic subscriptions are the caller's concern: subscribe through
/// [`MqttSink::subscribe`] with the filters the route table was
/// registered with.
pub fn connect(
	options: MqttOptions,
	capacity: usize,
) -> (MqttSink, MqttSource) {
	let (client, event_loop) = AsyncClient::new(options, capacity);
	let (sender, receiver) = mpsc::channel(capacity.max(1));

	tokio::spawn(run_event_loop(event_loop, sender));

	(MqttSink { client }, MqttSource { receiver })
}

/// Drives the rumqttc event loop until disconnect or too many
/// consecutive errors, forwarding inbound publishes to the source.
async fn run_event_loop(
	mut event_loop: EventLoop,
	sender: mpsc::Sender<RawMessage>,
) {
	let mut error_count: u32 = 0;

	loop {
		match event_loop.poll().await {
			| Ok(Incoming(Publish(publish))) => {
				error_count = 0;
				debug!(
					topic = %publish.topic,
					payload_size = publish.payload.len(),
					"Received MQTT message"
				);
				let message = RawMessage {
					topic: ArcStr::from(publish.topic.as_str()),
					payload: publish.payload,
					qos: from_rumqtt(publish.qos),
					retain: publish.retain,
				};
				if sender.send(message).await.is_err() {
					info!(
						"Message source dropped, terminating event loop"
					);
					break;
				}
			}
			| Ok(Incoming(Disconnect)) => {
				info!("Received MQTT Disconnect packet from server");
				break;
			}
			| Ok(Outgoing(rumqttc::Outgoing::Disconnect)) => {
				info!("Sent MQTT Disconnect packet to server");
				break;
			}
			| Ok(notification) => {
				error_count = 0;
				debug!(
					notification = ?notification,
					"Received MQTT notification"
				);
			}
			| Err(err) => {
				error_count += 1;
				error!(
					error_count = error_count,
					error = %err,
					"MQTT event loop error"
				);

				if error_count >= MAX_CONSECUTIVE_ERRORS {
					error!(
						error_count = error_count,
						max_errors = MAX_CONSECUTIVE_ERRORS,
						"Too many consecutive errors, terminating event \
						 loop"
					);
					break;
				}

				let delay = INITIAL_RETRY_DELAY
					* 2_u32.pow((error_count - 1).min(10));
				let delay = delay.min(MAX_RETRY_DELAY);

				warn!(
					delay = ?delay,
					error_count = error_count,
					"Retrying MQTT connection"
				);
				time::sleep(delay).await;
			}
		}
	}
	info!("MQTT event loop terminated");
	// Dropping the sender closes the source, which the dispatcher
	// observes as the source-closed condition.
}

#[async_trait]
impl MessageSource for MqttSource {
	async fn recv(&mut self) -> Option<RawMessage> {
		self.receiver.recv().await
	}
}

impl MqttSink {
	/// Subscribes to a topic filter on the broker.
	pub async fn subscribe(
		&self,
		filter: &str,
		qos: QoS,
	) -> Result<(), SinkError> {
		self.client
			.subscribe(filter, to_rumqtt(qos))
			.await
			.map_err(|err| SinkError::rejected(filter, err))
	}

	/// Sends a Disconnect packet, terminating the event loop and
	/// closing the paired source.
	pub async fn disconnect(&self) -> Result<(), SinkError> {
		self.client
			.disconnect()
			.await
			.map_err(|err| SinkError::rejected("<disconnect>", err))
	}
}

#[async_trait]
impl MessageSink for MqttSink {
	async fn publish(
		&self,
		topic: &str,
		payload: Vec<u8>,
		qos: QoS,
		retain: bool,
	) -> Result<(), SinkError> {
		self.client
			.publish(topic, to_rumqtt(qos), retain, payload)
			.await
			.map_err(|err| SinkError::rejected(topic, err))
	}
}

fn from_rumqtt(qos: rumqttc::QoS) -> QoS {
	match qos {
		| rumqttc::QoS::AtMostOnce => QoS::AtMostOnce,
		| rumqttc::QoS::AtLeastOnce => QoS::AtLeastOnce,
		| rumqttc::QoS::ExactlyOnce => QoS::ExactlyOnce,
	}
}

fn to_rumqtt(qos: QoS) -> rumqttc::QoS {
	match qos {
		| QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
		| QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
		| QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
	}
}
