//! Content reconciliation.
//!
//! Fetch completions arrive in any order. The [`ContentReconciler`] injects
//! content as soon as its region's node exists and buffers it otherwise;
//! buffered content is drained in declared key order whenever an injection
//! may have created the missing nodes. It never holds back a ready region to
//! wait for an earlier-declared one.
//!
//! The first injection into a region snapshots the region's original markup.
//! Removing the region's content restores that snapshot once and forgets it.

use crate::dom::Dom;
use crate::observer::Observers;
use crate::pair::RegionId;
use std::collections::{HashMap, HashSet};

/// What happened to one arrival.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arrival {
	/// Regions injected, in injection order (the arrival and drained keys).
	pub injected: Vec<RegionId>,
	/// Set when the arrival was buffered because its node is absent.
	pub buffered: Option<RegionId>,
	/// Set when the arrival's key is no longer expected.
	pub dropped: bool,
	/// Expected keys whose content arrived but whose nodes never appeared.
	pub not_found: Vec<RegionId>,
}

/// Buffers fetched content and injects it in declared order.
#[derive(Debug, Clone, Default)]
pub struct ContentReconciler {
	expected: Vec<RegionId>,
	buffer: HashMap<RegionId, String>,
	delivered: HashSet<RegionId>,
	reported: HashSet<RegionId>,
	snapshots: HashMap<RegionId, String>,
}

impl ContentReconciler {
	/// Creates an empty reconciler.
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts a new generation of expected keys.
	///
	/// Buffered content is discarded; late arrivals for keys outside
	/// `keys` will be dropped.
	pub fn set_keys(&mut self, keys: Vec<RegionId>) {
		self.expected = keys;
		self.buffer.clear();
		self.delivered.clear();
		self.reported.clear();
	}

	/// Appends keys to the current generation without discarding in-flight
	/// content for the other keys.
	pub fn extend_keys(&mut self, keys: impl IntoIterator<Item = RegionId>) {
		for key in keys {
			self.buffer.remove(&key);
			self.delivered.remove(&key);
			self.reported.remove(&key);
			if !self.expected.contains(&key) {
				self.expected.push(key);
			}
		}
	}

	/// Removes keys from the current generation.
	pub fn forget_keys(&mut self, keys: &[RegionId]) {
		self.expected.retain(|k| !keys.contains(k));
		for key in keys {
			self.buffer.remove(key);
			self.delivered.remove(key);
		}
	}

	/// Returns the expected keys in declared order.
	pub fn expected_keys(&self) -> &[RegionId] {
		&self.expected
	}

	/// Returns `true` when `target` is expected and has not been injected yet.
	pub fn is_pending(&self, target: &str) -> bool {
		self.expected.iter().any(|k| k == target) && !self.delivered.contains(target)
	}

	/// Returns `true` when content for `target` waits for its node.
	pub fn is_buffered(&self, target: &str) -> bool {
		self.buffer.contains_key(target)
	}

	/// Returns `true` when `target` holds injected content.
	pub fn has_snapshot(&self, target: &str) -> bool {
		self.snapshots.contains_key(target)
	}

	/// Handles one fetched payload.
	pub fn add_content<D: Dom>(
		&mut self,
		target: &RegionId,
		content: String,
		dom: &mut D,
		observers: &mut Observers,
	) -> Arrival {
		let mut arrival = Arrival::default();
		let Some(position) = self.expected.iter().position(|k| k == target) else {
			tracing::debug!(target_region = %target, "dropping content for a key no longer expected");
			arrival.dropped = true;
			return arrival;
		};

		match dom.find_region_node(target) {
			Some(node) => {
				self.buffer.remove(target);
				self.inject(target, &node, content, dom, observers);
				arrival.injected.push(target.clone());
				self.drain_range(position + 1, dom, observers, &mut arrival.injected);
			}
			None => {
				tracing::debug!(target_region = %target, "buffering content until its node exists");
				self.buffer.insert(target.clone(), content);
				arrival.buffered = Some(target.clone());
			}
		}

		self.drain_range(0, dom, observers, &mut arrival.injected);
		arrival.not_found = self.check_not_found();
		arrival
	}

	/// Re-scans the expected keys from the start, injecting buffered content
	/// whose node now exists.
	pub fn drain<D: Dom>(&mut self, dom: &mut D, observers: &mut Observers) -> Arrival {
		let mut arrival = Arrival::default();
		self.drain_range(0, dom, observers, &mut arrival.injected);
		arrival.not_found = self.check_not_found();
		arrival
	}

	/// Restores the default content of `target` and stops expecting content
	/// for it; an arrival still in flight is dropped.
	///
	/// Returns `true` when a snapshot was consumed. A second call for the
	/// same region is a no-op until new content is injected.
	pub fn remove_content<D: Dom>(
		&mut self,
		target: &RegionId,
		dom: &mut D,
		observers: &mut Observers,
	) -> bool {
		self.expected.retain(|k| k != target);
		self.buffer.remove(target);
		self.delivered.remove(target);
		self.reported.remove(target);
		let Some(mut snapshot) = self.snapshots.remove(target) else {
			return false;
		};
		match dom.find_region_node(target) {
			Some(node) => {
				observers.before_inject(target, &mut snapshot);
				dom.inject_replace(&node, &snapshot);
				observers.after_inject(target);
			}
			None => {
				tracing::debug!(target_region = %target, "region detached, discarding its snapshot");
			}
		}
		true
	}

	fn inject<D: Dom>(
		&mut self,
		target: &RegionId,
		node: &D::Node,
		mut content: String,
		dom: &mut D,
		observers: &mut Observers,
	) {
		if !self.snapshots.contains_key(target) {
			self.snapshots.insert(target.clone(), dom.content_of(node));
		}
		observers.before_inject(target, &mut content);
		dom.inject_replace(node, &content);
		self.delivered.insert(target.clone());
		observers.after_inject(target);
	}

	/// Walks expected keys from `start`, skipping delivered ones and stopping
	/// at the first key that has no buffered content or no node.
	fn drain_range<D: Dom>(
		&mut self,
		start: usize,
		dom: &mut D,
		observers: &mut Observers,
		injected: &mut Vec<RegionId>,
	) {
		let mut index = start;
		while index < self.expected.len() {
			let key = self.expected[index].clone();
			index += 1;
			if self.delivered.contains(&key) {
				continue;
			}
			if !self.buffer.contains_key(&key) {
				break;
			}
			let Some(node) = dom.find_region_node(&key) else {
				break;
			};
			if let Some(content) = self.buffer.remove(&key) {
				self.inject(&key, &node, content, dom, observers);
				injected.push(key);
			}
		}
	}

	fn check_not_found(&mut self) -> Vec<RegionId> {
		let all_arrived = self
			.expected
			.iter()
			.all(|k| self.delivered.contains(k) || self.buffer.contains_key(k));
		if !all_arrived {
			return Vec::new();
		}
		let missing: Vec<RegionId> = self
			.expected
			.iter()
			.filter(|k| self.buffer.contains_key(*k) && !self.reported.contains(*k))
			.cloned()
			.collect();
		self.reported.extend(missing.iter().cloned());
		missing
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	/// Flat document: region id -> content, no nesting.
	#[derive(Default)]
	struct MapDom {
		nodes: HashMap<String, String>,
	}

	impl MapDom {
		fn with(ids: &[(&str, &str)]) -> Self {
			Self {
				nodes: ids
					.iter()
					.map(|(id, content)| (id.to_string(), content.to_string()))
					.collect(),
			}
		}

		fn content(&self, id: &str) -> Option<&str> {
			self.nodes.get(id).map(String::as_str)
		}
	}

	impl Dom for MapDom {
		type Node = String;

		fn find_region_node(&self, id: &RegionId) -> Option<String> {
			self.nodes.contains_key(id.as_str()).then(|| id.to_string())
		}

		fn inject_replace(&mut self, node: &String, content: &str) {
			self.nodes.insert(node.clone(), content.to_string());
		}

		fn content_of(&self, node: &String) -> String {
			self.nodes.get(node).cloned().unwrap_or_default()
		}

		fn is_descendant(&self, _ancestor: &String, _candidate: &String) -> bool {
			false
		}
	}

	fn keys(ids: &[&str]) -> Vec<RegionId> {
		ids.iter().map(|id| RegionId::new(*id)).collect()
	}

	#[fixture]
	fn observers() -> Observers {
		Observers::new()
	}

	#[rstest]
	fn test_buffered_until_node_appears(mut observers: Observers) {
		let mut dom = MapDom::with(&[("a", "original a")]);
		let mut reconciler = ContentReconciler::new();
		reconciler.set_keys(keys(&["a", "b"]));

		let first = reconciler.add_content(&RegionId::new("b"), "Y".into(), &mut dom, &mut observers);
		assert_eq!(first.buffered, Some(RegionId::new("b")));
		assert!(first.not_found.is_empty());

		let second = reconciler.add_content(&RegionId::new("a"), "X".into(), &mut dom, &mut observers);
		assert_eq!(second.injected, keys(&["a"]));
		assert_eq!(dom.content("a"), Some("X"));
		assert!(reconciler.is_buffered("b"));
		assert_eq!(second.not_found, keys(&["b"]));

		dom.nodes.insert("b".into(), "original b".into());
		let drained = reconciler.drain(&mut dom, &mut observers);

		assert_eq!(drained.injected, keys(&["b"]));
		assert_eq!(dom.content("b"), Some("Y"));
		assert!(!reconciler.is_buffered("b"));
	}

	#[rstest]
	fn test_arrival_drains_later_keys_in_order(mut observers: Observers) {
		let mut dom = MapDom::with(&[("a", "")]);
		let mut reconciler = ContentReconciler::new();
		reconciler.set_keys(keys(&["a", "b", "c"]));

		reconciler.add_content(&RegionId::new("c"), "Z".into(), &mut dom, &mut observers);
		reconciler.add_content(&RegionId::new("b"), "Y".into(), &mut dom, &mut observers);
		dom.nodes.insert("b".into(), String::new());
		dom.nodes.insert("c".into(), String::new());

		let arrival = reconciler.add_content(&RegionId::new("a"), "X".into(), &mut dom, &mut observers);

		assert_eq!(arrival.injected, keys(&["a", "b", "c"]));
		assert!(arrival.not_found.is_empty());
	}

	#[rstest]
	fn test_ready_region_is_not_held_back(mut observers: Observers) {
		let mut dom = MapDom::with(&[("a", ""), ("b", "")]);
		let mut reconciler = ContentReconciler::new();
		reconciler.set_keys(keys(&["a", "b"]));

		let arrival = reconciler.add_content(&RegionId::new("b"), "Y".into(), &mut dom, &mut observers);

		assert_eq!(arrival.injected, keys(&["b"]));
		assert_eq!(dom.content("b"), Some("Y"));
	}

	#[rstest]
	fn test_late_arrival_for_replaced_key_is_dropped(mut observers: Observers) {
		let mut dom = MapDom::with(&[("a", "original"), ("c", "")]);
		let mut reconciler = ContentReconciler::new();
		reconciler.set_keys(keys(&["a"]));
		reconciler.set_keys(keys(&["c"]));

		let arrival = reconciler.add_content(&RegionId::new("a"), "late".into(), &mut dom, &mut observers);

		assert!(arrival.dropped);
		assert_eq!(dom.content("a"), Some("original"));
		assert!(!reconciler.has_snapshot("a"));
	}

	#[rstest]
	fn test_remove_restores_snapshot_once(mut observers: Observers) {
		let mut dom = MapDom::with(&[("a", "original")]);
		let mut reconciler = ContentReconciler::new();
		reconciler.set_keys(keys(&["a"]));
		reconciler.add_content(&RegionId::new("a"), "first".into(), &mut dom, &mut observers);
		reconciler.extend_keys(keys(&["a"]));
		reconciler.add_content(&RegionId::new("a"), "second".into(), &mut dom, &mut observers);

		assert!(reconciler.remove_content(&RegionId::new("a"), &mut dom, &mut observers));
		assert_eq!(dom.content("a"), Some("original"));

		dom.nodes.insert("a".into(), "changed elsewhere".into());
		assert!(!reconciler.remove_content(&RegionId::new("a"), &mut dom, &mut observers));
		assert_eq!(dom.content("a"), Some("changed elsewhere"));
	}

	#[rstest]
	fn test_removed_region_is_no_longer_expected(mut observers: Observers) {
		let mut dom = MapDom::with(&[("a", "original"), ("b", "")]);
		let mut reconciler = ContentReconciler::new();
		reconciler.set_keys(keys(&["a", "b"]));

		reconciler.remove_content(&RegionId::new("a"), &mut dom, &mut observers);
		assert!(!reconciler.is_pending("a"));
		assert_eq!(reconciler.expected_keys(), keys(&["b"]).as_slice());

		let late = reconciler.add_content(&RegionId::new("a"), "stale".into(), &mut dom, &mut observers);
		assert!(late.dropped);
		assert_eq!(dom.content("a"), Some("original"));
	}

	#[rstest]
	fn test_not_found_reported_once(mut observers: Observers) {
		let mut dom = MapDom::default();
		let mut reconciler = ContentReconciler::new();
		reconciler.set_keys(keys(&["ghost"]));

		let arrival = reconciler.add_content(&RegionId::new("ghost"), "G".into(), &mut dom, &mut observers);
		assert_eq!(arrival.not_found, keys(&["ghost"]));

		let again = reconciler.drain(&mut dom, &mut observers);
		assert!(again.not_found.is_empty());
	}

	#[rstest]
	fn test_pending_until_injected(mut observers: Observers) {
		let mut dom = MapDom::with(&[("a", "")]);
		let mut reconciler = ContentReconciler::new();
		reconciler.set_keys(keys(&["a"]));
		assert!(reconciler.is_pending("a"));
		assert!(!reconciler.is_pending("b"));

		reconciler.add_content(&RegionId::new("a"), "X".into(), &mut dom, &mut observers);

		assert!(!reconciler.is_pending("a"));
	}

	#[rstest]
	fn test_forget_keys_drops_buffer(mut observers: Observers) {
		let mut dom = MapDom::default();
		let mut reconciler = ContentReconciler::new();
		reconciler.set_keys(keys(&["a", "b"]));
		reconciler.add_content(&RegionId::new("a"), "X".into(), &mut dom, &mut observers);

		reconciler.forget_keys(&keys(&["a"]));

		assert!(!reconciler.is_buffered("a"));
		assert_eq!(reconciler.expected_keys(), keys(&["b"]).as_slice());
	}
}
