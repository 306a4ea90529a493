#![allow(clippy::missing_docs_in_private_items)]
#![allow(missing_docs)]

use std::fmt;

use arcstr::{ArcStr, Substr};
use smallvec::SmallVec;

/// A concrete '/'-separated topic, pre-split into segments.
///
/// Segments borrow from the shared topic string, so cloning a
/// `TopicPath` never copies the underlying text.
#[derive(Debug, Clone)]
pub struct TopicPath {
	/// Full topic string.
	pub path: ArcStr,
	/// Topic split on '/'.
	pub segments: SmallVec<[Substr; 8]>,
}

impl TopicPath {
	pub fn new(path: impl Into<ArcStr>) -> Self {
		let path = path.into();
		let segments =
			path.split('/').map(|s| path.substr_from(s)).collect();
		Self { path, segments }
	}

	pub fn path(&self) -> ArcStr {
		self.path.clone()
	}

	pub fn segments(&self) -> &[Substr] {
		&self.segments
	}

	/// True for broker-internal topics such as `$SYS/...`.
	///
	/// Wildcard filter segments never match the first segment of these
	/// topics; only an identical literal segment does.
	pub fn is_system(&self) -> bool {
		self.segments
			.first()
			.is_some_and(|segment| segment.starts_with('$'))
	}
}

impl From<&str> for TopicPath {
	fn from(path: &str) -> Self {
		Self::new(ArcStr::from(path))
	}
}

impl fmt::Display for TopicPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.path)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_on_separator() {
		let path = TopicPath::from("sensors/kitchen/temperature");
		assert_eq!(path.segments(), &["sensors", "kitchen", "temperature"]);
	}

	#[test]
	fn keeps_empty_segments() {
		let path = TopicPath::from("a//b/");
		assert_eq!(path.segments(), &["a", "", "b", ""]);
	}

	#[test]
	fn detects_system_topics() {
		assert!(TopicPath::from("$SYS/broker/uptime").is_system());
		assert!(TopicPath::from("$share/group/topic").is_system());
		assert!(!TopicPath::from("sensors/$weird").is_system());
	}
}
