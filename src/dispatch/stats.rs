use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of dispatch counters.
///
/// Counters are monotonically increasing for the lifetime of the
/// client; a snapshot may be taken in any lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
	/// Handler invocations that completed successfully.
	pub delivered: u64,
	/// Messages dropped because no route matched (not an error).
	pub unrouted: u64,
	/// Per-route decode failures.
	pub decode_failures: u64,
	/// Contained handler failures (including panicked handler tasks).
	pub handler_failures: u64,
}

/// Shared atomic counters behind the [`DispatchStats`] snapshots.
#[derive(Debug, Default)]
pub(crate) struct StatsHandle {
	delivered: AtomicU64,
	unrouted: AtomicU64,
	decode_failures: AtomicU64,
	handler_failures: AtomicU64,
}

impl StatsHandle {
	pub(crate) fn record_delivered(&self) {
		self.delivered.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_unrouted(&self) {
		self.unrouted.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_decode_failure(&self) {
		self.decode_failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_handler_failure(&self) {
		self.handler_failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn snapshot(&self) -> DispatchStats {
		DispatchStats {
			delivered: self.delivered.load(Ordering::Relaxed),
			unrouted: self.unrouted.load(Ordering::Relaxed),
			decode_failures: self.decode_failures.load(Ordering::Relaxed),
			handler_failures: self
				.handler_failures
				.load(Ordering::Relaxed),
		}
	}
}
