//! Document access used by the reconciler and for cascade checks.

use crate::pair::RegionId;
use crate::store::RegionTree;

/// Minimal view of the document the engine injects into.
///
/// Implementations own the actual node lookup and markup replacement; the
/// engine never walks the document itself.
pub trait Dom {
	/// Handle to a region's node.
	type Node: Clone;

	/// Finds the node of an addressable region.
	fn find_region_node(&self, id: &RegionId) -> Option<Self::Node>;

	/// Replaces the node's content with `content`.
	fn inject_replace(&mut self, node: &Self::Node, content: &str);

	/// Returns the node's current content, used to snapshot default markup.
	fn content_of(&self, node: &Self::Node) -> String;

	/// Returns `true` when `candidate` lies strictly inside `ancestor`.
	fn is_descendant(&self, ancestor: &Self::Node, candidate: &Self::Node) -> bool;
}

/// Answers nesting questions for the store by looking regions up in a [`Dom`].
pub struct DomTree<'a, D: Dom>(pub &'a D);

impl<D: Dom> RegionTree for DomTree<'_, D> {
	fn is_nested(&self, ancestor: &RegionId, candidate: &RegionId) -> bool {
		match (
			self.0.find_region_node(ancestor),
			self.0.find_region_node(candidate),
		) {
			(Some(a), Some(c)) => self.0.is_descendant(&a, &c),
			_ => false,
		}
	}
}
