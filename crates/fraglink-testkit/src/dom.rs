//! In-memory document.

use fraglink_core::{Dom, RegionId};
use regex::Regex;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::OnceLock;

fn id_attribute() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();
	PATTERN.get_or_init(|| Regex::new(r#"\bid\s*=\s*"([^"]+)""#).unwrap())
}

#[derive(Debug, Clone)]
struct Node {
	parent: Option<String>,
	content: String,
}

#[derive(Debug, Default)]
struct DomState {
	nodes: BTreeMap<String, Node>,
	injections: Vec<(String, String)>,
}

impl DomState {
	fn descendants(&self, ancestor: &str) -> Vec<String> {
		self.nodes
			.keys()
			.filter(|id| self.is_descendant(ancestor, id))
			.cloned()
			.collect()
	}

	fn is_descendant(&self, ancestor: &str, candidate: &str) -> bool {
		let mut current = candidate;
		while let Some(parent) = self.nodes.get(current).and_then(|n| n.parent.as_deref()) {
			if parent == ancestor {
				return true;
			}
			current = parent;
		}
		false
	}

	/// Replaces the children of `id` with the regions declared in `content`.
	fn rebuild_children(&mut self, id: &str, content: &str) {
		for gone in self.descendants(id) {
			self.nodes.remove(&gone);
		}
		for capture in id_attribute().captures_iter(content) {
			let child = capture[1].to_string();
			if self.nodes.contains_key(&child) {
				tracing::debug!(region = %child, "duplicate region id in injected markup");
				continue;
			}
			self.nodes.insert(
				child,
				Node {
					parent: Some(id.to_string()),
					content: String::new(),
				},
			);
		}
	}
}

/// Shared, cloneable in-memory document.
///
/// Regions are identified by id. Injecting markup into a region removes its
/// former descendants and creates one child region per `id="..."` attribute
/// found in the markup; markup nested inside those children is not parsed.
///
/// ```
/// use fraglink_testkit::MockDom;
///
/// let dom = MockDom::new()
/// 	.with_region("main", r#"<p>home</p><div id="side"></div>"#);
/// assert!(dom.contains("side"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockDom {
	state: Rc<RefCell<DomState>>,
}

impl MockDom {
	/// Creates an empty document.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a top-level region.
	pub fn with_region(self, id: &str, content: &str) -> Self {
		self.insert(id, None, content);
		self
	}

	/// Adds a region nested inside `parent`.
	pub fn with_nested(self, id: &str, parent: &str, content: &str) -> Self {
		self.insert(id, Some(parent), content);
		self
	}

	/// Inserts or overwrites a region, rebuilding its children from `content`.
	pub fn insert(&self, id: &str, parent: Option<&str>, content: &str) {
		let mut state = self.state.borrow_mut();
		state.nodes.insert(
			id.to_string(),
			Node {
				parent: parent.map(str::to_string),
				content: content.to_string(),
			},
		);
		state.rebuild_children(id, content);
	}

	/// Removes a region and its descendants.
	pub fn remove(&self, id: &str) {
		let mut state = self.state.borrow_mut();
		for gone in state.descendants(id) {
			state.nodes.remove(&gone);
		}
		state.nodes.remove(id);
	}

	/// Returns `true` when the region exists.
	pub fn contains(&self, id: &str) -> bool {
		self.state.borrow().nodes.contains_key(id)
	}

	/// Returns the region's current markup.
	pub fn content(&self, id: &str) -> Option<String> {
		self.state.borrow().nodes.get(id).map(|n| n.content.clone())
	}

	/// Returns every injection as `(region, markup)`, oldest first.
	pub fn injections(&self) -> Vec<(String, String)> {
		self.state.borrow().injections.clone()
	}

	/// Returns the regions injected into, oldest first.
	pub fn injected_regions(&self) -> Vec<String> {
		self.state
			.borrow()
			.injections
			.iter()
			.map(|(id, _)| id.clone())
			.collect()
	}

	/// Forgets the injection log.
	pub fn clear_injections(&self) {
		self.state.borrow_mut().injections.clear();
	}
}

impl Dom for MockDom {
	type Node = String;

	fn find_region_node(&self, id: &RegionId) -> Option<String> {
		self.contains(id.as_str()).then(|| id.to_string())
	}

	fn inject_replace(&mut self, node: &String, content: &str) {
		let mut state = self.state.borrow_mut();
		let Some(entry) = state.nodes.get_mut(node) else {
			return;
		};
		entry.content = content.to_string();
		state.rebuild_children(node, content);
		state.injections.push((node.clone(), content.to_string()));
	}

	fn content_of(&self, node: &String) -> String {
		self.content(node).unwrap_or_default()
	}

	fn is_descendant(&self, ancestor: &String, candidate: &String) -> bool {
		self.state.borrow().is_descendant(ancestor, candidate)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_injection_replaces_children() {
		let mut dom = MockDom::new().with_region("main", r#"<div id="side"></div>"#);
		assert!(dom.is_descendant(&"main".to_string(), &"side".to_string()));

		dom.inject_replace(&"main".to_string(), r#"<div id="inner"></div>"#);

		assert!(!dom.contains("side"));
		assert!(dom.contains("inner"));
		assert_eq!(dom.injected_regions(), vec!["main"]);
	}

	#[rstest]
	fn test_nesting_is_transitive() {
		let dom = MockDom::new()
			.with_region("main", "")
			.with_nested("side", "main", "")
			.with_nested("inner", "side", "");

		assert!(dom.is_descendant(&"main".to_string(), &"inner".to_string()));
		assert!(!dom.is_descendant(&"inner".to_string(), &"main".to_string()));
	}

	#[rstest]
	fn test_clones_share_the_document() {
		let dom = MockDom::new();
		let handle = dom.clone();

		dom.insert("late", None, "");

		assert!(handle.contains("late"));
	}
}
