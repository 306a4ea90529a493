//! In-memory channel transport
//!
//! Backs the dispatch core with plain tokio mpsc channels instead of a
//! broker connection. Used by the test suite and useful for embedding
//! the dispatcher in-process.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use super::{MessageSink, MessageSource, SinkError};
use crate::message::{QoS, RawMessage};

/// A message accepted by a [`ChannelSink`], with its publish metadata.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
	/// Topic the message was published on.
	pub topic: String,
	/// Encoded payload.
	pub payload: Bytes,
	/// Requested QoS.
	pub qos: QoS,
	/// Requested retain flag.
	pub retain: bool,
}

/// Message source fed from an mpsc channel.
///
/// Dropping the paired sender closes the source.
pub struct ChannelSource {
	receiver: mpsc::Receiver<RawMessage>,
}

/// Creates a channel-backed source together with its feeding sender.
pub fn channel_source(
	capacity: usize,
) -> (mpsc::Sender<RawMessage>, ChannelSource) {
	let (sender, receiver) = mpsc::channel(capacity);
	(sender, ChannelSource { receiver })
}

#[async_trait]
impl MessageSource for ChannelSource {
	async fn recv(&mut self) -> Option<RawMessage> {
		self.receiver.recv().await
	}
}

/// Message sink that records published messages on a channel.
///
/// Dropping the paired receiver makes later publishes fail with
/// [`SinkError::Closed`].
pub struct ChannelSink {
	sender: mpsc::UnboundedSender<PublishedMessage>,
}

/// Creates a channel-backed sink together with the receiving side.
pub fn channel_sink()
-> (ChannelSink, mpsc::UnboundedReceiver<PublishedMessage>) {
	let (sender, receiver) = mpsc::unbounded_channel();
	(ChannelSink { sender }, receiver)
}

#[async_trait]
impl MessageSink for ChannelSink {
	async fn publish(
		&self,
		topic: &str,
		payload: Vec<u8>,
		qos: QoS,
		retain: bool,
	) -> Result<(), SinkError> {
		self.sender
			.send(PublishedMessage {
				topic: topic.to_string(),
				payload: Bytes::from(payload),
				qos,
				retain,
			})
			.map_err(|_| SinkError::closed(topic))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn source_closes_when_sender_drops() {
		let (sender, mut source) = channel_source(4);
		sender
			.send(RawMessage::new("a/b", vec![1u8]))
			.await
			.unwrap();
		drop(sender);

		assert!(source.recv().await.is_some());
		assert!(source.recv().await.is_none());
	}

	#[tokio::test]
	async fn sink_records_publish_metadata() {
		let (sink, mut published) = channel_sink();
		sink.publish("out/t", vec![7u8], QoS::ExactlyOnce, true)
			.await
			.unwrap();

		let message = published.recv().await.unwrap();
		assert_eq!(message.topic, "out/t");
		assert_eq!(message.payload.as_ref(), &[7u8]);
		assert_eq!(message.qos, QoS::ExactlyOnce);
		assert!(message.retain);
	}

	#[tokio::test]
	async fn sink_fails_after_receiver_drops() {
		let (sink, published) = channel_sink();
		drop(published);
		let err = sink
			.publish("out/t", vec![], QoS::AtMostOnce, false)
			.await
			.unwrap_err();
		assert!(matches!(err, SinkError::Closed { .. }));
	}
}
