use std::sync::Arc;

use thiserror::Error;

use super::handler::{ErasedHandler, RouteHandler, TypedHandler};
use crate::codec::PayloadType;
use crate::topic::{TopicFilter, TopicPath};

/// Errors that can occur during route registration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
	/// The exact (filter, payload type) pair is already registered
	#[error(
		"Route already registered for filter '{filter}' with payload type \
		 {payload_type}"
	)]
	DuplicateRoute {
		filter: String,
		payload_type: PayloadType,
	},
}

impl RouteError {
	/// Creates a new DuplicateRoute error
	pub fn duplicate_route(
		filter: impl Into<String>,
		payload_type: PayloadType,
	) -> Self {
		Self::DuplicateRoute {
			filter: filter.into(),
			payload_type,
		}
	}
}

/// One (topic filter, payload type, handler) registration.
///
/// Owned exclusively by the [`RouteTable`]; identity is the
/// (filter, payload type) pair.
pub struct Route {
	filter: TopicFilter,
	payload_type: PayloadType,
	handler: Arc<dyn ErasedHandler>,
}

impl Route {
	/// The filter this route is registered under.
	pub fn filter(&self) -> &TopicFilter {
		&self.filter
	}

	/// The payload type this route decodes into.
	pub fn payload_type(&self) -> PayloadType {
		self.payload_type
	}

	pub(crate) fn handler(&self) -> Arc<dyn ErasedHandler> {
		Arc::clone(&self.handler)
	}
}

impl std::fmt::Debug for Route {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Route")
			.field("filter", &self.filter.as_str())
			.field("payload_type", &self.payload_type)
			.finish_non_exhaustive()
	}
}

/// Ordered collection of route registrations.
///
/// Insertion order is preserved and is the tie-break for dispatch when
/// several routes match one topic. Routes are fixed after startup: the
/// table is frozen behind an `Arc` when the dispatcher starts, so
/// resolution during dispatch is lock-free.
#[derive(Default)]
pub struct RouteTable {
	routes: Vec<Route>,
}

impl RouteTable {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handler` for messages matching `filter`, decoded as
	/// payload type `T`.
	///
	/// Duplicate registrations for the same filter are permitted if
	/// their payload types differ; an exact (filter, payload type)
	/// duplicate is rejected and leaves the table unchanged.
	pub fn register<T, H>(
		&mut self,
		filter: TopicFilter,
		handler: H,
	) -> Result<(), RouteError>
	where
		T: Send + Sync + 'static,
		H: RouteHandler<T>,
	{
		let payload_type = PayloadType::of::<T>();
		if self
			.routes
			.iter()
			.any(|r| r.filter == filter && r.payload_type == payload_type)
		{
			return Err(RouteError::duplicate_route(
				filter.as_str(),
				payload_type,
			));
		}
		self.routes.push(Route {
			filter,
			payload_type,
			handler: Arc::new(TypedHandler::new(handler)),
		});
		Ok(())
	}

	/// Returns all routes whose filter matches `topic`, in
	/// registration order.
	pub fn resolve(&self, topic: &TopicPath) -> Vec<&Route> {
		self.routes
			.iter()
			.filter(|route| route.filter.matches(topic))
			.collect()
	}

	/// All registered routes, in registration order.
	pub fn iter(&self) -> impl Iterator<Item = &Route> {
		self.routes.iter()
	}

	/// Number of registered routes.
	pub fn len(&self) -> usize {
		self.routes.len()
	}

	/// True if no route is registered.
	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::routing::handler::{DecodedMessage, HandlerOutcome};

	async fn ignore_u32(_message: DecodedMessage<u32>) -> HandlerOutcome<u32> {
		Ok(None)
	}

	async fn ignore_string(
		_message: DecodedMessage<String>,
	) -> HandlerOutcome<String> {
		Ok(None)
	}

	fn filter(pattern: &str) -> TopicFilter {
		TopicFilter::parse(pattern).unwrap()
	}

	#[test]
	fn duplicate_pair_is_rejected() {
		let mut table = RouteTable::new();
		table.register::<u32, _>(filter("a/+"), ignore_u32).unwrap();

		let err = table
			.register::<u32, _>(filter("a/+"), ignore_u32)
			.unwrap_err();
		assert!(matches!(err, RouteError::DuplicateRoute { .. }));
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn same_filter_distinct_payload_types_coexist() {
		let mut table = RouteTable::new();
		table.register::<u32, _>(filter("a/+"), ignore_u32).unwrap();
		table
			.register::<String, _>(filter("a/+"), ignore_string)
			.unwrap();

		let matched = table.resolve(&TopicPath::from("a/b"));
		assert_eq!(matched.len(), 2);
		assert_eq!(matched[0].payload_type(), PayloadType::of::<u32>());
		assert_eq!(matched[1].payload_type(), PayloadType::of::<String>());
	}

	#[test]
	fn resolve_preserves_registration_order() {
		let mut table = RouteTable::new();
		table.register::<u32, _>(filter("#"), ignore_u32).unwrap();
		table
			.register::<String, _>(filter("b/#"), ignore_string)
			.unwrap();
		table
			.register::<String, _>(filter("b/c"), ignore_string)
			.unwrap();

		let matched = table.resolve(&TopicPath::from("b/c"));
		let filters: Vec<_> =
			matched.iter().map(|r| r.filter().as_str()).collect();
		assert_eq!(filters, ["#", "b/#", "b/c"]);
	}

	#[test]
	fn resolve_without_match_is_empty() {
		let mut table = RouteTable::new();
		table
			.register::<u32, _>(filter("a/b"), ignore_u32)
			.unwrap();
		assert!(table.resolve(&TopicPath::from("x/y")).is_empty());
	}
}
