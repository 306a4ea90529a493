//! Topic handling module
//!
//! Provides the concrete-topic and topic-filter types together with the
//! wildcard matching rules used to resolve inbound messages to routes.

pub mod topic_filter;
pub mod topic_path;


pub use topic_filter::{FilterSegment, TopicFilter, TopicFilterError};
pub use topic_path::TopicPath;
