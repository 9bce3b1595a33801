//! Path-segment grammar: `/docs/@!main=a.html,!side=b.html?lang=en`.
//!
//! The pairs occupy the last path segment, introduced by `@`. Query string
//! and hash are carried over untouched when composing.

use super::{Grammar, UrlCodec};

const AT: char = '@';
const SEGMENT_MARKER: &str = "/@";

/// Codec keeping the pairs in an `@` path segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtInclusionCodec;

/// Splits an address into its path and the query/hash remainder.
fn split_path(address: &str) -> (&str, &str) {
	let end = address.find(['?', '#']).unwrap_or(address.len());
	address.split_at(end)
}

impl UrlCodec for AtInclusionCodec {
	fn grammar(&self) -> Grammar {
		Grammar::AtInclusion
	}

	fn prefix(&self) -> char {
		AT
	}

	fn extract<'a>(&self, address: &'a str) -> Option<&'a str> {
		let (path, _) = split_path(address);
		match path.find(SEGMENT_MARKER) {
			Some(index) => Some(&path[index + 1..]),
			None => Some(""),
		}
	}

	fn compose(&self, address: &str, encoded: &str) -> String {
		let (path, rest) = split_path(address);
		let base = path.find(SEGMENT_MARKER).map_or(path, |i| &path[..i]);

		let mut out = String::with_capacity(base.len() + encoded.len() + rest.len() + 1);
		out.push_str(base);
		if !encoded.is_empty() {
			if !base.ends_with('/') {
				out.push('/');
			}
			out.push_str(encoded);
		} else if base.is_empty() {
			out.push('/');
		}
		out.push_str(rest);
		out
	}
}
