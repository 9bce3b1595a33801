//! Region/resource bindings.
//!
//! A [`Pair`] binds one addressable page region to the resource currently
//! driving its content. A [`PairState`] is the ordered list of pairs applied
//! to the document; its order declares load and injection priority.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Resource value that restores the region's original markup.
pub const DEFAULT_SENTINEL: &str = "default";

/// Identifier of an addressable page region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
	/// Creates a region identifier.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Returns the identifier as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the identifier is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for RegionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Borrow<str> for RegionId {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl AsRef<str> for RegionId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl From<&str> for RegionId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl From<String> for RegionId {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl PartialEq<str> for RegionId {
	fn eq(&self, other: &str) -> bool {
		self.0 == other
	}
}

impl PartialEq<&str> for RegionId {
	fn eq(&self, other: &&str) -> bool {
		self.0 == *other
	}
}

/// What drives a region's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
	/// The region's original markup, as captured before the first override.
	Default,
	/// A locator handed to the fetcher.
	Locator(String),
}

impl Resource {
	/// Parses a decoded resource value, mapping the sentinel to [`Resource::Default`].
	pub fn parse(value: impl Into<String>) -> Self {
		let value = value.into();
		if value == DEFAULT_SENTINEL {
			Self::Default
		} else {
			Self::Locator(value)
		}
	}

	/// Returns the locator, or `None` for the default sentinel.
	pub fn locator(&self) -> Option<&str> {
		match self {
			Self::Default => None,
			Self::Locator(locator) => Some(locator),
		}
	}

	/// Returns `true` for the default sentinel.
	pub fn is_default(&self) -> bool {
		matches!(self, Self::Default)
	}

	/// Returns the address form of this resource.
	pub fn as_str(&self) -> &str {
		match self {
			Self::Default => DEFAULT_SENTINEL,
			Self::Locator(locator) => locator,
		}
	}
}

impl fmt::Display for Resource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl From<&str> for Resource {
	fn from(value: &str) -> Self {
		Self::parse(value)
	}
}

impl From<String> for Resource {
	fn from(value: String) -> Self {
		Self::parse(value)
	}
}

/// A region bound to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pair {
	/// Region being driven.
	pub target: RegionId,
	/// Resource driving it.
	pub resource: Resource,
}

impl Pair {
	/// Creates a pair.
	pub fn new(target: impl Into<RegionId>, resource: impl Into<Resource>) -> Self {
		Self {
			target: target.into(),
			resource: resource.into(),
		}
	}
}

impl fmt::Display for Pair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}={}", self.target, self.resource)
	}
}

/// Ordered list of applied pairs with unique targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairState {
	pairs: Vec<Pair>,
}

impl PairState {
	/// Creates an empty state.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a state from an ordered list, keeping the first occurrence of
	/// every target.
	pub fn from_pairs(pairs: impl IntoIterator<Item = Pair>) -> Self {
		let mut state = Self::new();
		for pair in pairs {
			if state.contains(&pair.target) {
				tracing::debug!(target_region = %pair.target, "dropping duplicate target");
				continue;
			}
			state.pairs.push(pair);
		}
		state
	}

	/// Returns the pairs in declared order.
	pub fn pairs(&self) -> &[Pair] {
		&self.pairs
	}

	/// Returns the number of pairs.
	pub fn len(&self) -> usize {
		self.pairs.len()
	}

	/// Returns `true` when no pair is applied.
	pub fn is_empty(&self) -> bool {
		self.pairs.is_empty()
	}

	/// Looks up the pair bound to `target`.
	pub fn get(&self, target: impl AsRef<str>) -> Option<&Pair> {
		let target = target.as_ref();
		self.pairs.iter().find(|p| p.target.as_str() == target)
	}

	/// Returns `true` when `target` is bound.
	pub fn contains(&self, target: impl AsRef<str>) -> bool {
		self.get(target).is_some()
	}

	/// Returns the position of `target` in declared order.
	pub fn position(&self, target: impl AsRef<str>) -> Option<usize> {
		let target = target.as_ref();
		self.pairs.iter().position(|p| p.target.as_str() == target)
	}

	/// Returns the targets in declared order.
	pub fn targets(&self) -> impl Iterator<Item = &RegionId> {
		self.pairs.iter().map(|p| &p.target)
	}

	/// Iterates over the pairs.
	pub fn iter(&self) -> std::slice::Iter<'_, Pair> {
		self.pairs.iter()
	}

	pub(crate) fn push(&mut self, pair: Pair) {
		debug_assert!(!self.contains(&pair.target));
		self.pairs.push(pair);
	}
}

impl<'a> IntoIterator for &'a PairState {
	type Item = &'a Pair;
	type IntoIter = std::slice::Iter<'a, Pair>;

	fn into_iter(self) -> Self::IntoIter {
		self.pairs.iter()
	}
}

impl FromIterator<Pair> for PairState {
	fn from_iter<I: IntoIterator<Item = Pair>>(iter: I) -> Self {
		Self::from_pairs(iter)
	}
}
