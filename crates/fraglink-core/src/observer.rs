//! Extension points.
//!
//! Cross-cutting behavior (lifecycle classes, transitions, script
//! re-execution, analytics) plugs into the engine through an ordered list of
//! [`EngineObserver`]s instead of wrapping engine functions. Every hook has a
//! no-op default so observers implement only what they need.

use crate::codec::Operation;
use crate::pair::{PairState, RegionId};
use crate::store::ApplyReport;
use std::fmt;

/// Hooks invoked by the engine at fixed points of a cycle.
pub trait EngineObserver {
	/// Called once per cycle before the store diffs `operations` against `current`.
	fn before_diff(&mut self, current: &PairState, operations: &[Operation]) {
		let _ = (current, operations);
	}

	/// Called once per cycle after the store committed `state`.
	fn after_diff(&mut self, state: &PairState, report: &ApplyReport) {
		let _ = (state, report);
	}

	/// Called before content is injected into `target`; may rewrite it.
	fn before_inject(&mut self, target: &RegionId, content: &mut String) {
		let _ = (target, content);
	}

	/// Called after content was injected into `target`.
	fn after_inject(&mut self, target: &RegionId) {
		let _ = target;
	}
}

/// Ordered observer list.
#[derive(Default)]
pub struct Observers {
	list: Vec<Box<dyn EngineObserver>>,
}

impl fmt::Debug for Observers {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Observers")
			.field("count", &self.list.len())
			.finish()
	}
}

impl Observers {
	/// Creates an empty list.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends an observer; observers run in registration order.
	pub fn push(&mut self, observer: Box<dyn EngineObserver>) {
		self.list.push(observer);
	}

	/// Returns the number of observers.
	pub fn len(&self) -> usize {
		self.list.len()
	}

	/// Returns `true` when no observer is registered.
	pub fn is_empty(&self) -> bool {
		self.list.is_empty()
	}

	pub(crate) fn before_diff(&mut self, current: &PairState, operations: &[Operation]) {
		for observer in &mut self.list {
			observer.before_diff(current, operations);
		}
	}

	pub(crate) fn after_diff(&mut self, state: &PairState, report: &ApplyReport) {
		for observer in &mut self.list {
			observer.after_diff(state, report);
		}
	}

	pub(crate) fn before_inject(&mut self, target: &RegionId, content: &mut String) {
		for observer in &mut self.list {
			observer.before_inject(target, content);
		}
	}

	pub(crate) fn after_inject(&mut self, target: &RegionId) {
		for observer in &mut self.list {
			observer.after_inject(target);
		}
	}
}
