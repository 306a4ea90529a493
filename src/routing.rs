//! Route registration and resolution
//!
//! An ordered table of (topic filter, payload type, handler)
//! registrations. Registration happens before the dispatcher starts;
//! during dispatch the table is shared read-only, so resolution takes
//! no lock.

pub mod handler;
pub mod route_table;

pub use handler::{
	DecodedMessage, HandlerError, HandlerOutcome, Response, RouteHandler,
};
pub use route_table::{Route, RouteError, RouteTable};

pub(crate) use handler::{ErasedHandler, ErasedResponse};
