//! Topic filter parsing and wildcard matching.
//!
//! A filter follows MQTT subscription semantics: '/'-separated
//! segments, `+` matching exactly one segment, `#` matching all
//! remaining segments and legal only in last position.

use std::fmt;
use std::str::FromStr;

use arcstr::{ArcStr, Substr};
use thiserror::Error;

use super::topic_path::TopicPath;

/// One segment of a parsed [`TopicFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterSegment {
	/// Literal segment, matched by exact case-sensitive comparison.
	Literal(Substr),
	/// `+` wildcard, matches exactly one segment of any value.
	SingleLevel,
	/// `#` wildcard, matches zero or more trailing segments.
	MultiLevel,
}

impl FilterSegment {
	/// Canonical string form of the segment.
	pub fn as_str(&self) -> &str {
		match self {
			| FilterSegment::Literal(s) => s,
			| FilterSegment::SingleLevel => "+",
			| FilterSegment::MultiLevel => "#",
		}
	}

	fn is_wildcard(&self) -> bool {
		!matches!(self, FilterSegment::Literal(_))
	}
}

impl fmt::Display for FilterSegment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Error types for topic filter parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicFilterError {
	/// Multi-level wildcard (#) used not at the end of the filter
	#[error(
		"Invalid topic filter '{filter}': # wildcard can only be the last \
		 segment"
	)]
	HashPosition { filter: String },

	/// Wildcard characters (+ or #) mixed with other characters
	#[error("Invalid wildcard usage in segment '{segment}'")]
	WildcardUsage { segment: String },

	/// Empty filter is not valid
	#[error("Topic filter cannot be empty")]
	EmptyFilter,
}

impl TopicFilterError {
	/// Creates a new HashPosition error
	pub fn hash_position(filter: impl Into<String>) -> Self {
		Self::HashPosition {
			filter: filter.into(),
		}
	}

	/// Creates a new WildcardUsage error
	pub fn wildcard_usage(segment: impl Into<String>) -> Self {
		Self::WildcardUsage {
			segment: segment.into(),
		}
	}
}

impl TryFrom<Substr> for FilterSegment {
	type Error = TopicFilterError;

	fn try_from(segment: Substr) -> Result<Self, Self::Error> {
		let res = match segment.as_str() {
			| "+" => FilterSegment::SingleLevel,
			| "#" => FilterSegment::MultiLevel,
			| _ if segment.contains(['+', '#']) => {
				return Err(TopicFilterError::wildcard_usage(
					segment.as_str(),
				));
			}
			| _ => FilterSegment::Literal(segment),
		};
		Ok(res)
	}
}

/// An immutable, validated MQTT topic filter.
///
/// Constructed once at registration time and never modified; matching
/// against concrete topics is pure and allocation-free.
#[derive(Debug, Clone)]
pub struct TopicFilter {
	filter: ArcStr,
	segments: Vec<FilterSegment>,
}

impl TopicFilter {
	/// Parses a filter string, validating wildcard placement.
	pub fn parse(
		filter: impl Into<ArcStr>,
	) -> Result<Self, TopicFilterError> {
		let filter = filter.into();
		if filter.is_empty() || filter.trim().is_empty() {
			return Err(TopicFilterError::EmptyFilter);
		}

		let segments: Result<Vec<_>, _> = filter
			.split('/')
			.map(|s| filter.substr_from(s))
			.map(FilterSegment::try_from)
			.collect();
		let segments = segments?;

		if let Some(hash_pos) = segments
			.iter()
			.position(|s| matches!(*s, FilterSegment::MultiLevel))
		{
			if hash_pos != segments.len() - 1 {
				return Err(TopicFilterError::hash_position(
					filter.as_str(),
				));
			}
		}

		Ok(Self { filter, segments })
	}

	/// The filter segments in order.
	pub fn segments(&self) -> &[FilterSegment] {
		&self.segments
	}

	/// The original filter string.
	pub fn as_str(&self) -> &str {
		&self.filter
	}

	/// True if the filter contains any wildcard segment.
	pub fn has_wildcards(&self) -> bool {
		self.segments.iter().any(FilterSegment::is_wildcard)
	}

	/// Matches a concrete topic against this filter.
	///
	/// Segment-by-segment comparison, case-sensitive, no
	/// normalization. `+` matches exactly one segment and never a
	/// missing one; a trailing `#` matches zero or more remaining
	/// segments. Topics whose first segment starts with `$` are only
	/// matched by filters beginning with the same literal segment;
	/// a leading wildcard never matches them.
	pub fn matches(&self, topic: &TopicPath) -> bool {
		if topic.is_system()
			&& self.segments.first().is_some_and(FilterSegment::is_wildcard)
		{
			return false;
		}

		let topic_segments = topic.segments();
		let mut topic_index = 0;
		for filter_segment in &self.segments {
			match filter_segment {
				| FilterSegment::Literal(expected) => {
					match topic_segments.get(topic_index) {
						| Some(found) if *found == *expected => {
							topic_index += 1;
						}
						| _ => return false,
					}
				}
				| FilterSegment::SingleLevel => {
					if topic_index >= topic_segments.len() {
						return false;
					}
					topic_index += 1;
				}
				| FilterSegment::MultiLevel => {
					// Validated to be last; consumes the remainder,
					// including zero remaining segments.
					return true;
				}
			}
		}
		topic_index == topic_segments.len()
	}

	/// Convenience wrapper over [`TopicFilter::matches`] for plain
	/// string topics.
	pub fn matches_topic(&self, topic: &str) -> bool {
		self.matches(&TopicPath::from(topic))
	}
}

impl PartialEq for TopicFilter {
	fn eq(&self, other: &Self) -> bool {
		self.segments == other.segments
	}
}

impl Eq for TopicFilter {}

impl std::hash::Hash for TopicFilter {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.segments.hash(state);
	}
}

impl FromStr for TopicFilter {
	type Err = TopicFilterError;

	fn from_str(filter: &str) -> Result<Self, Self::Err> {
		Self::parse(filter)
	}
}

impl fmt::Display for TopicFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.filter)
	}
}
