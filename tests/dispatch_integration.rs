//! Integration tests for the full dispatch path
//!
//! Drives a `DispatchClient` over the in-memory channel transport:
//! inbound messages are fed through the source side and outbound
//! publishes are observed on the sink side, so the whole
//! resolve/decode/invoke/forward pipeline runs without a broker.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use bincode::{Decode, Encode};
use mqtt_dispatch::transport::memory::{
	self, ChannelSource, PublishedMessage,
};
use mqtt_dispatch::{
	BincodeCodec, DecodedMessage, DispatchClient, DispatchConfig,
	DispatcherState, HandlerError, MessageCodec, QoS, RawMessage,
	Response, StopReason,
};
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

#[derive(Encode, Decode, Debug, Clone, PartialEq)]
struct Reading {
	sensor: String,
	value: u32,
}

type TestClient = DispatchClient<ChannelSource, BincodeCodec>;

fn new_client(
	max_in_flight: usize,
) -> (
	TestClient,
	mpsc::Sender<RawMessage>,
	mpsc::UnboundedReceiver<PublishedMessage>,
) {
	let (inbound, source) = memory::channel_source(64);
	let (sink, outbound) = memory::channel_sink();
	let client = TestClient::new(
		source,
		sink,
		DispatchConfig::new().with_max_in_flight(max_in_flight),
	);
	(client, inbound, outbound)
}

fn encode<T>(value: &T) -> Vec<u8>
where BincodeCodec: MessageCodec<T> {
	BincodeCodec::new().encode(value).unwrap()
}

async fn wait_stopped(client: &TestClient) {
	timeout(Duration::from_secs(5), client.stopped())
		.await
		.expect("dispatcher did not stop in time");
}

#[tokio::test]
async fn delivers_typed_messages_to_matching_routes() {
	let (client, inbound, _outbound) = new_client(4);

	let seen = Arc::new(Mutex::new(Vec::new()));
	let seen_clone = Arc::clone(&seen);
	client
		.route::<Reading, _>("sensors/+/reading", move |message: DecodedMessage<Reading>| {
			let seen = Arc::clone(&seen_clone);
			async move {
				seen.lock().await.push(message.payload);
				Ok(None)
			}
		})
		.unwrap();
	client.start().unwrap();

	let reading = Reading {
		sensor: "kitchen".to_string(),
		value: 23,
	};
	inbound
		.send(RawMessage::new(
			"sensors/kitchen/reading",
			encode(&reading),
		))
		.await
		.unwrap();
	// Does not match the filter: one level too deep
	inbound
		.send(RawMessage::new(
			"sensors/kitchen/reading/raw",
			encode(&reading),
		))
		.await
		.unwrap();
	drop(inbound);

	wait_stopped(&client).await;
	assert_eq!(client.state(), DispatcherState::Stopped);

	let seen = seen.lock().await;
	assert_eq!(seen.as_slice(), &[reading]);

	let stats = client.stats();
	assert_eq!(stats.delivered, 1);
	assert_eq!(stats.unrouted, 1);
}

#[tokio::test]
async fn malformed_payload_is_contained() {
	let (client, inbound, _outbound) = new_client(4);

	let delivered = Arc::new(AtomicU32::new(0));
	let delivered_clone = Arc::clone(&delivered);
	client
		.route::<Reading, _>("t/#", move |_message| {
			let delivered = Arc::clone(&delivered_clone);
			async move {
				delivered.fetch_add(1, Ordering::SeqCst);
				Ok(None)
			}
		})
		.unwrap();
	client.start().unwrap();

	// Garbage bytes produce exactly one decode failure...
	inbound
		.send(RawMessage::new("t/bad", vec![0xff, 0xff, 0xff]))
		.await
		.unwrap();
	// ...and the next valid message on the same route still arrives.
	let reading = Reading {
		sensor: "ok".to_string(),
		value: 1,
	};
	inbound
		.send(RawMessage::new("t/good", encode(&reading)))
		.await
		.unwrap();
	drop(inbound);

	wait_stopped(&client).await;

	assert_eq!(delivered.load(Ordering::SeqCst), 1);
	let stats = client.stats();
	assert_eq!(stats.decode_failures, 1);
	assert_eq!(stats.delivered, 1);
}

#[tokio::test]
async fn handler_failure_does_not_stop_dispatch() {
	let (client, inbound, _outbound) = new_client(4);

	client
		.route::<u32, _>("jobs/fail", |_message: DecodedMessage<u32>| {
			async move { Err(HandlerError::new("boom")) }
		})
		.unwrap();
	let ok_count = Arc::new(AtomicU32::new(0));
	let ok_clone = Arc::clone(&ok_count);
	client
		.route::<u32, _>("jobs/ok", move |_message| {
			let ok_count = Arc::clone(&ok_clone);
			async move {
				ok_count.fetch_add(1, Ordering::SeqCst);
				Ok(None)
			}
		})
		.unwrap();
	client.start().unwrap();

	inbound
		.send(RawMessage::new("jobs/fail", encode(&7u32)))
		.await
		.unwrap();
	inbound
		.send(RawMessage::new("jobs/ok", encode(&7u32)))
		.await
		.unwrap();
	drop(inbound);

	wait_stopped(&client).await;

	assert_eq!(ok_count.load(Ordering::SeqCst), 1);
	let stats = client.stats();
	assert_eq!(stats.handler_failures, 1);
	assert_eq!(stats.delivered, 1);
}

#[tokio::test]
async fn handler_response_is_encoded_and_forwarded() {
	let (client, inbound, mut outbound) = new_client(4);

	client
		.route::<u32, _>("calc/in", |message: DecodedMessage<u32>| {
			async move {
				Ok(Some(
					Response::new("calc/out", message.payload + 1)
						.with_qos(QoS::ExactlyOnce),
				))
			}
		})
		.unwrap();
	client.start().unwrap();

	inbound
		.send(RawMessage::new("calc/in", encode(&41u32)))
		.await
		.unwrap();
	drop(inbound);
	wait_stopped(&client).await;

	let published = outbound.recv().await.expect("response published");
	assert_eq!(published.topic, "calc/out");
	assert_eq!(published.qos, QoS::ExactlyOnce);
	let answer: u32 =
		BincodeCodec::new().decode(&published.payload).unwrap();
	assert_eq!(answer, 42);
}

#[tokio::test]
async fn concurrency_bound_of_one_serializes_handlers() {
	let (client, inbound, _outbound) = new_client(1);

	let spans = Arc::new(Mutex::new(Vec::<(Instant, Instant)>::new()));
	let spans_clone = Arc::clone(&spans);
	client
		.route::<u32, _>("work/+", move |_message| {
			let spans = Arc::clone(&spans_clone);
			async move {
				let started = Instant::now();
				sleep(Duration::from_millis(80)).await;
				spans.lock().await.push((started, Instant::now()));
				Ok(None)
			}
		})
		.unwrap();
	client.start().unwrap();

	for topic in ["work/a", "work/b"] {
		inbound
			.send(RawMessage::new(topic, encode(&1u32)))
			.await
			.unwrap();
	}
	drop(inbound);
	wait_stopped(&client).await;

	let spans = spans.lock().await;
	assert_eq!(spans.len(), 2);
	// Strictly sequential: the second may not start before the first
	// finished.
	let first_end = spans[0].1.min(spans[1].1);
	let last_start = spans[0].0.max(spans[1].0);
	assert!(
		last_start >= first_end,
		"handlers overlapped under max_in_flight = 1"
	);
}

#[tokio::test]
async fn concurrency_bound_of_two_allows_overlap() {
	let (client, inbound, _outbound) = new_client(2);

	let spans = Arc::new(Mutex::new(Vec::<(Instant, Instant)>::new()));
	let spans_clone = Arc::clone(&spans);
	client
		.route::<u32, _>("work/+", move |_message| {
			let spans = Arc::clone(&spans_clone);
			async move {
				let started = Instant::now();
				sleep(Duration::from_millis(150)).await;
				spans.lock().await.push((started, Instant::now()));
				Ok(None)
			}
		})
		.unwrap();
	client.start().unwrap();

	for topic in ["work/a", "work/b"] {
		inbound
			.send(RawMessage::new(topic, encode(&1u32)))
			.await
			.unwrap();
	}
	drop(inbound);
	wait_stopped(&client).await;

	let spans = spans.lock().await;
	assert_eq!(spans.len(), 2);
	let last_start = spans[0].0.max(spans[1].0);
	let first_end = spans[0].1.min(spans[1].1);
	assert!(
		last_start < first_end,
		"handlers did not overlap under max_in_flight = 2"
	);
}

#[tokio::test]
async fn stop_waits_for_in_flight_handlers() {
	let (client, inbound, _outbound) = new_client(4);

	let started = Arc::new(tokio::sync::Notify::new());
	let finished = Arc::new(AtomicU32::new(0));
	let started_clone = Arc::clone(&started);
	let finished_clone = Arc::clone(&finished);
	client
		.route::<u32, _>("slow/+", move |_message| {
			let started = Arc::clone(&started_clone);
			let finished = Arc::clone(&finished_clone);
			async move {
				started.notify_one();
				sleep(Duration::from_millis(200)).await;
				finished.fetch_add(1, Ordering::SeqCst);
				Ok(None)
			}
		})
		.unwrap();
	client.start().unwrap();

	inbound
		.send(RawMessage::new("slow/job", encode(&1u32)))
		.await
		.unwrap();
	started.notified().await;

	// The handler is in flight now; stop() must wait for it.
	let reason = client.stop().await.unwrap();
	assert_eq!(reason, StopReason::Drained);
	assert_eq!(client.state(), DispatcherState::Stopped);
	assert_eq!(finished.load(Ordering::SeqCst), 1);

	// Idempotent once stopped.
	assert_eq!(client.stop().await.unwrap(), StopReason::Drained);
}

#[tokio::test]
async fn source_close_stops_the_dispatcher() {
	let (client, inbound, _outbound) = new_client(4);
	client
		.route::<u32, _>("t/+", |_message: DecodedMessage<u32>| {
			async move { Ok(None) }
		})
		.unwrap();
	client.start().unwrap();

	drop(inbound);
	wait_stopped(&client).await;

	// stop() after the fact reports why the dispatcher went down.
	assert_eq!(client.stop().await.unwrap(), StopReason::SourceClosed);
}

#[tokio::test]
async fn route_after_start_is_rejected() {
	let (client, _inbound, _outbound) = new_client(4);
	client
		.route::<u32, _>("a/b", |_message: DecodedMessage<u32>| {
			async move { Ok(None) }
		})
		.unwrap();
	client.start().unwrap();

	let err = client
		.route::<u32, _>("a/c", |_message: DecodedMessage<u32>| {
			async move { Ok(None) }
		})
		.unwrap_err();
	assert!(matches!(
		err,
		mqtt_dispatch::ClientError::AlreadyStarted
	));

	client.stop().await.unwrap();
}

#[tokio::test]
async fn publish_round_trip_through_sink() {
	let (client, _inbound, mut outbound) = new_client(4);

	let reading = Reading {
		sensor: "out".to_string(),
		value: 9,
	};
	// publish() is legal before start()
	client.publish("readings/out", &reading).await.unwrap();

	let published = outbound.recv().await.unwrap();
	assert_eq!(published.topic, "readings/out");
	assert_eq!(published.qos, QoS::AtLeastOnce);
	assert!(!published.retain);
	let decoded: Reading =
		BincodeCodec::new().decode(&published.payload).unwrap();
	assert_eq!(decoded, reading);
}

#[tokio::test]
async fn publish_rejects_wildcard_topics() {
	let (client, _inbound, _outbound) = new_client(4);
	let err = client.publish("bad/+/topic", &1u32).await.unwrap_err();
	assert!(matches!(
		err,
		mqtt_dispatch::ClientError::InvalidTopic { .. }
	));
}
