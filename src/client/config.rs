//! Configuration for the dispatch client

/// Default bound on concurrently running handler invocations.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Behavior settings for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
	/// Maximum handler invocations in flight at once, across sibling
	/// routes of one message and across distinct messages alike.
	/// Intake from the message source pauses while the bound is
	/// reached. Values below 1 are treated as 1.
	pub max_in_flight: usize,
}

impl Default for DispatchConfig {
	fn default() -> Self {
		Self {
			max_in_flight: DEFAULT_MAX_IN_FLIGHT,
		}
	}
}

impl DispatchConfig {
	/// Creates the default configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the handler concurrency bound.
	pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
		self.max_in_flight = max_in_flight;
		self
	}
}
