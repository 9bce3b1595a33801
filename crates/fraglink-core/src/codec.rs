//! Address codecs.
//!
//! A codec turns the pair-carrying portion of an address into an ordered list
//! of [`Operation`]s and turns a [`PairState`] back into its canonical
//! declarative form. Two grammars share the token syntax and differ only in
//! where the pairs live inside the address:
//!
//! | Grammar | Example |
//! |---------|---------|
//! | [`HashBangCodec`] | `/index.html#!main=page1.html,!side=side1.html` |
//! | [`AtInclusionCodec`] | `/docs/@!main=page1.html,!side=side1.html?lang=en` |
//!
//! Tokens are comma separated and take one of the forms `target=resource`,
//! `+target=resource` or `-target`, optionally preceded by the pair marker
//! `!`. When the first token carries an operator the whole fragment is read
//! as a list of incremental changes, otherwise as a full declarative list.
//! Malformed tokens are skipped.

mod at_inclusion;
mod hash_bang;

pub use at_inclusion::AtInclusionCodec;
pub use hash_bang::HashBangCodec;

use crate::pair::{Pair, PairState, RegionId, Resource};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between tokens.
pub const SEPARATOR: char = ',';
/// Marker preceding every canonical token.
pub const PAIR_MARKER: char = '!';
/// Incremental add operator.
pub const ADD_OPERATOR: char = '+';
/// Incremental remove operator.
pub const REMOVE_OPERATOR: char = '-';
/// Separator between target and resource.
pub const KEY_VALUE_SEPARATOR: char = '=';

const RESOURCE_ESCAPES: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'#')
	.add(b'%')
	.add(b',')
	.add(b'<')
	.add(b'>')
	.add(b'?')
	.add(b'`')
	.add(b'{')
	.add(b'}');

const TARGET_ESCAPES: &AsciiSet = &RESOURCE_ESCAPES
	.add(b'=')
	.add(b'+')
	.add(b'!')
	.add(b'/')
	.add(b'@');

/// One change decoded from an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
	/// Replace the whole applied list.
	SetAll(PairState),
	/// Bind (or rebind) one region.
	Add(Pair),
	/// Unbind one region.
	Remove(RegionId),
}

/// Which grammar an engine reads and writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grammar {
	/// Pairs live in the address hash.
	#[default]
	HashBang,
	/// Pairs live in a path segment introduced by `@`.
	AtInclusion,
}

impl Grammar {
	/// Returns the codec implementing this grammar.
	pub fn codec(self) -> Box<dyn UrlCodec> {
		match self {
			Self::HashBang => Box::new(HashBangCodec),
			Self::AtInclusion => Box::new(AtInclusionCodec),
		}
	}
}

impl fmt::Display for Grammar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::HashBang => f.write_str("hash_bang"),
			Self::AtInclusion => f.write_str("at_inclusion"),
		}
	}
}

/// Contract shared by both address grammars.
pub trait UrlCodec {
	/// The grammar implemented.
	fn grammar(&self) -> Grammar;

	/// Character introducing the pair-carrying portion.
	fn prefix(&self) -> char;

	/// Locates the pair-carrying portion of a full address, prefix included.
	///
	/// Returns `Some("")` when the address carries no pairs and `None` when
	/// the relevant address component belongs to someone else (a plain
	/// in-page anchor, for instance) and must be left alone.
	fn extract<'a>(&self, address: &'a str) -> Option<&'a str>;

	/// Builds a new address by swapping the pair-carrying portion of
	/// `address` for `encoded`.
	fn compose(&self, address: &str, encoded: &str) -> String;

	/// Decodes a fragment (with or without its prefix) into operations.
	fn decode(&self, fragment: &str) -> Vec<Operation> {
		let body = fragment.strip_prefix(self.prefix()).unwrap_or(fragment);
		decode_tokens(body)
	}

	/// Encodes a state into its canonical declarative fragment.
	///
	/// An empty state encodes to the empty string.
	fn encode(&self, state: &PairState) -> String {
		if state.is_empty() {
			return String::new();
		}
		let mut out = String::new();
		out.push(self.prefix());
		out.push_str(&encode_tokens(state));
		out
	}

	/// Extracts and decodes in one step.
	fn decode_address(&self, address: &str) -> Option<Vec<Operation>> {
		self.extract(address).map(|fragment| self.decode(fragment))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
	Add,
	Remove,
}

#[derive(Debug)]
struct Token {
	operator: Option<Operator>,
	target: RegionId,
	resource: Option<Resource>,
}

fn parse_token(raw: &str) -> Option<Token> {
	let mut rest = raw.trim();
	rest = rest.strip_prefix(PAIR_MARKER).unwrap_or(rest);

	let operator = if let Some(stripped) = rest.strip_prefix(ADD_OPERATOR) {
		rest = stripped;
		Some(Operator::Add)
	} else if let Some(stripped) = rest.strip_prefix(REMOVE_OPERATOR) {
		rest = stripped;
		Some(Operator::Remove)
	} else {
		None
	};
	// `+!target=x` is accepted as well as `!+target=x`
	rest = rest.strip_prefix(PAIR_MARKER).unwrap_or(rest);

	let (target, resource) = match rest.split_once(KEY_VALUE_SEPARATOR) {
		Some((target, resource)) => (target, Some(resource)),
		None => (rest, None),
	};
	let target = unescape(target);
	if target.is_empty() {
		return None;
	}

	Some(Token {
		operator,
		target: RegionId::new(target),
		resource: resource.map(|r| Resource::parse(unescape(r))),
	})
}

/// Decodes a token list with the prefix already stripped.
pub(crate) fn decode_tokens(body: &str) -> Vec<Operation> {
	let raw_tokens: Vec<&str> = body
		.split(SEPARATOR)
		.filter(|t| !t.trim().is_empty())
		.collect();

	let incremental = raw_tokens
		.first()
		.and_then(|first| parse_token(first))
		.is_some_and(|token| token.operator.is_some());

	if incremental {
		decode_incremental(&raw_tokens)
	} else {
		vec![Operation::SetAll(decode_declarative(&raw_tokens))]
	}
}

fn decode_declarative(raw_tokens: &[&str]) -> PairState {
	let mut pairs = Vec::with_capacity(raw_tokens.len());
	for raw in raw_tokens {
		match parse_token(raw) {
			Some(Token {
				operator: None,
				target,
				resource: Some(resource),
			}) => pairs.push(Pair { target, resource }),
			_ => tracing::debug!(token = %raw, "skipping malformed declarative token"),
		}
	}
	PairState::from_pairs(pairs)
}

fn decode_incremental(raw_tokens: &[&str]) -> Vec<Operation> {
	let mut operations = Vec::with_capacity(raw_tokens.len());
	let mut current = Operator::Add;
	for raw in raw_tokens {
		let Some(token) = parse_token(raw) else {
			tracing::debug!(token = %raw, "skipping malformed incremental token");
			continue;
		};
		let operator = token.operator.unwrap_or(current);
		current = operator;
		match (operator, token.resource) {
			(Operator::Add, Some(resource)) => operations.push(Operation::Add(Pair {
				target: token.target,
				resource,
			})),
			(Operator::Add, None) => {
				tracing::debug!(token = %raw, "skipping add token without resource")
			}
			(Operator::Remove, _) => operations.push(Operation::Remove(token.target)),
		}
	}
	operations
}

/// Encodes the tokens of a state without any grammar prefix.
pub(crate) fn encode_tokens(state: &PairState) -> String {
	state
		.iter()
		.map(|pair| {
			format!(
				"{}{}{}{}",
				PAIR_MARKER,
				escape_target(pair.target.as_str()),
				KEY_VALUE_SEPARATOR,
				utf8_percent_encode(pair.resource.as_str(), RESOURCE_ESCAPES)
			)
		})
		.collect::<Vec<_>>()
		.join(",")
}

fn escape_target(target: &str) -> String {
	let escaped = utf8_percent_encode(target, TARGET_ESCAPES).to_string();
	// a leading '-' would read back as the remove operator
	match escaped.strip_prefix(REMOVE_OPERATOR) {
		Some(rest) => format!("%2D{}", rest),
		None => escaped,
	}
}

fn unescape(value: &str) -> String {
	percent_decode_str(value).decode_utf8_lossy().into_owned()
}
