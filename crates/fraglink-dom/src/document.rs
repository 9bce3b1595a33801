//! Document access through `web-sys`.

use fraglink_core::{Dom, RegionId};
use web_sys::{Document, Element, Node};

/// [`Dom`] over the live document; regions are elements found by id.
#[derive(Debug, Clone)]
pub struct WebDom {
	document: Document,
}

impl WebDom {
	/// Wraps `document`.
	pub fn new(document: Document) -> Self {
		Self { document }
	}
}

impl Dom for WebDom {
	type Node = Element;

	fn find_region_node(&self, id: &RegionId) -> Option<Element> {
		self.document.get_element_by_id(id.as_str())
	}

	fn inject_replace(&mut self, node: &Element, content: &str) {
		// SAFETY(XSS): content comes from the site's own resources; observers
		// may sanitize it in `before_inject`.
		node.set_inner_html(content);
	}

	fn content_of(&self, node: &Element) -> String {
		node.inner_html()
	}

	fn is_descendant(&self, ancestor: &Element, candidate: &Element) -> bool {
		let ancestor: &Node = ancestor;
		let candidate: &Node = candidate;
		!ancestor.is_same_node(Some(candidate)) && ancestor.contains(Some(candidate))
	}
}
