//! Hash-fragment grammar: `/page.html#!main=a.html,!side=b.html`.

use super::{ADD_OPERATOR, Grammar, KEY_VALUE_SEPARATOR, PAIR_MARKER, REMOVE_OPERATOR, SEPARATOR, UrlCodec};

const HASH: char = '#';

/// Codec keeping the pairs in the address hash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashBangCodec;

impl UrlCodec for HashBangCodec {
	fn grammar(&self) -> Grammar {
		Grammar::HashBang
	}

	fn prefix(&self) -> char {
		HASH
	}

	fn extract<'a>(&self, address: &'a str) -> Option<&'a str> {
		let Some(index) = address.find(HASH) else {
			return Some("");
		};
		let fragment = &address[index..];
		let body = &fragment[HASH.len_utf8()..];
		if is_pair_list(body) {
			Some(fragment)
		} else {
			// plain in-page anchor
			None
		}
	}

	fn compose(&self, address: &str, encoded: &str) -> String {
		let base = address.find(HASH).map_or(address, |i| &address[..i]);
		format!("{}{}", base, encoded)
	}
}

/// The marker is optional, so an unmarked body counts as pairs when its
/// first token binds a value.
fn is_pair_list(body: &str) -> bool {
	if body.is_empty() || body.starts_with([PAIR_MARKER, ADD_OPERATOR, REMOVE_OPERATOR]) {
		return true;
	}
	body.split(SEPARATOR)
		.next()
		.is_some_and(|token| token.contains(KEY_VALUE_SEPARATOR))
}
