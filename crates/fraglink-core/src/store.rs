//! Pair state store.
//!
//! [`PairStore`] owns the applied [`PairState`] and turns decoded
//! [`Operation`]s into add/replace/delete callbacks on a [`PairHandler`].
//!
//! ## Declarative diff
//!
//! The old and new lists are walked position by position. A mismatched
//! target deletes the old entry and advances only the old cursor; a matched
//! target is left alone when the resource is unchanged and replaced
//! otherwise. Whatever remains of the old list is deleted, whatever remains
//! of the new list is added, in declared order.
//!
//! The walk is greedy and never backtracks, so a pair that only moved can be
//! deleted and added again:
//!
//! ```text
//! old: a=x, b=y     new: b=y, a=x
//! a != b at position 0 -> delete a
//! b == b               -> keep b
//! new list left: a=x   -> add a
//! ```
//!
//! ## Cascades
//!
//! Deleting or replacing a pair also deletes every later pair whose region is
//! nested inside it. Nested pairs are deleted before the pair itself so their
//! default content is restored into nodes that are still attached.

use crate::codec::Operation;
use crate::pair::{Pair, PairState, RegionId};
use std::collections::HashSet;
use std::ops::ControlFlow;

/// Answers whether one region's node lies inside another's.
pub trait RegionTree {
	/// Returns `true` when `candidate` is nested inside `ancestor`.
	fn is_nested(&self, ancestor: &RegionId, candidate: &RegionId) -> bool;
}

/// Nesting relations captured before a batch mutates the document.
///
/// Cascades are decided against the document as it was when the batch
/// started, so restores and injections performed by the handler cannot change
/// the outcome half-way through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nesting {
	relations: HashSet<(RegionId, RegionId)>,
}

impl Nesting {
	/// Records every (ancestor, descendant) relation among the targets of `state`.
	pub fn capture(state: &PairState, tree: &dyn RegionTree) -> Self {
		let mut relations = HashSet::new();
		for ancestor in state.targets() {
			for candidate in state.targets() {
				if ancestor != candidate && tree.is_nested(ancestor, candidate) {
					relations.insert((ancestor.clone(), candidate.clone()));
				}
			}
		}
		Self { relations }
	}

	/// Returns the number of recorded relations.
	pub fn len(&self) -> usize {
		self.relations.len()
	}

	/// Returns `true` when no region of the state is nested in another.
	pub fn is_empty(&self) -> bool {
		self.relations.is_empty()
	}
}

impl RegionTree for Nesting {
	fn is_nested(&self, ancestor: &RegionId, candidate: &RegionId) -> bool {
		self.relations
			.contains(&(ancestor.clone(), candidate.clone()))
	}
}

/// Receives the transitions computed by the store.
///
/// Returning [`ControlFlow::Break`] from [`on_add`](Self::on_add) or
/// [`on_replace`](Self::on_replace) stops the batch: the pair is not
/// committed and the remaining operations are dropped. Transitions applied
/// before the stop stay applied.
pub trait PairHandler {
	/// A region gains a binding.
	fn on_add(&mut self, pair: &Pair) -> ControlFlow<()>;

	/// A bound region switches resource.
	fn on_replace(&mut self, new: &Pair, old: &Pair) -> ControlFlow<()>;

	/// A region loses its binding.
	fn on_delete(&mut self, pair: &Pair);
}

/// What one apply call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
	/// Targets added, in callback order.
	pub added: Vec<RegionId>,
	/// Targets replaced, in callback order.
	pub replaced: Vec<RegionId>,
	/// Targets deleted, cascades included, in callback order.
	pub deleted: Vec<RegionId>,
	/// Target whose add or replace stopped the batch.
	pub aborted_at: Option<RegionId>,
}

impl ApplyReport {
	/// Returns `true` when no callback fired.
	pub fn is_empty(&self) -> bool {
		self.added.is_empty()
			&& self.replaced.is_empty()
			&& self.deleted.is_empty()
			&& self.aborted_at.is_none()
	}

	/// Returns `true` when a handler stopped the batch.
	pub fn is_aborted(&self) -> bool {
		self.aborted_at.is_some()
	}

	fn merge(&mut self, other: ApplyReport) {
		self.added.extend(other.added);
		self.replaced.extend(other.replaced);
		self.deleted.extend(other.deleted);
		if other.aborted_at.is_some() {
			self.aborted_at = other.aborted_at;
		}
	}
}

/// Holds the applied pair list.
#[derive(Debug, Clone, Default)]
pub struct PairStore {
	state: PairState,
}

impl PairStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the applied state.
	pub fn state(&self) -> &PairState {
		&self.state
	}

	/// Applies decoded operations in sequence, stopping at the first abort.
	pub fn apply(
		&mut self,
		operations: &[Operation],
		handler: &mut dyn PairHandler,
		tree: &dyn RegionTree,
	) -> ApplyReport {
		let mut report = ApplyReport::default();
		let mut index = 0;
		while index < operations.len() {
			if let Operation::SetAll(pairs) = &operations[index] {
				report.merge(self.apply_declarative(pairs, handler, tree));
				index += 1;
			} else {
				let end = operations[index..]
					.iter()
					.position(|op| matches!(op, Operation::SetAll(_)))
					.map_or(operations.len(), |offset| index + offset);
				report.merge(self.apply_incremental(&operations[index..end], handler, tree));
				index = end;
			}
			if report.is_aborted() {
				break;
			}
		}
		report
	}

	/// Diffs `new` against the applied state and commits the result.
	pub fn apply_declarative(
		&mut self,
		new: &PairState,
		handler: &mut dyn PairHandler,
		tree: &dyn RegionTree,
	) -> ApplyReport {
		let old = self.state.pairs().to_vec();
		let new = new.pairs();
		let mut gone = HashSet::new();
		let mut next = PairState::new();
		let mut report = ApplyReport::default();
		let (mut i, mut j) = (0, 0);

		while i < old.len() && j < new.len() {
			if gone.contains(&old[i].target) {
				i += 1;
				continue;
			}
			let (current, wanted) = (&old[i], &new[j]);
			if current.target != wanted.target {
				delete_cascading(&old, i, &mut gone, handler, tree, &mut report);
				i += 1;
				continue;
			}
			if current.resource == wanted.resource {
				next.push(current.clone());
				i += 1;
				j += 1;
				continue;
			}

			let nested = nested_after(&old, i, &gone, tree);
			if handler.on_replace(wanted, current).is_break() {
				tracing::warn!(target_region = %wanted.target, "replace stopped the batch");
				report.aborted_at = Some(wanted.target.clone());
				for pair in &old[i..] {
					if !gone.contains(&pair.target) && !next.contains(&pair.target) {
						next.push(pair.clone());
					}
				}
				self.state = next;
				return report;
			}
			for index in nested {
				delete_one(&old[index], &mut gone, handler, &mut report);
			}
			report.replaced.push(wanted.target.clone());
			next.push(wanted.clone());
			i += 1;
			j += 1;
		}

		while i < old.len() {
			if !gone.contains(&old[i].target) {
				delete_cascading(&old, i, &mut gone, handler, tree, &mut report);
			}
			i += 1;
		}

		for wanted in &new[j..] {
			if handler.on_add(wanted).is_break() {
				tracing::warn!(target_region = %wanted.target, "add stopped the batch");
				report.aborted_at = Some(wanted.target.clone());
				break;
			}
			report.added.push(wanted.target.clone());
			next.push(wanted.clone());
		}

		self.state = next;
		report
	}

	/// Applies `Add`/`Remove` operations against the applied state.
	///
	/// `SetAll` entries are ignored here; use [`apply`](Self::apply) for mixed
	/// lists.
	pub fn apply_incremental(
		&mut self,
		operations: &[Operation],
		handler: &mut dyn PairHandler,
		tree: &dyn RegionTree,
	) -> ApplyReport {
		let mut working = self.state.pairs().to_vec();
		let mut report = ApplyReport::default();

		for operation in operations {
			match operation {
				Operation::Add(pair) => {
					let Some(index) = working.iter().position(|p| p.target == pair.target) else {
						if handler.on_add(pair).is_break() {
							tracing::warn!(target_region = %pair.target, "add stopped the batch");
							report.aborted_at = Some(pair.target.clone());
							break;
						}
						report.added.push(pair.target.clone());
						working.push(pair.clone());
						continue;
					};
					if working[index].resource == pair.resource {
						continue;
					}
					let nested = nested_after(&working, index, &HashSet::new(), tree);
					if handler.on_replace(pair, &working[index]).is_break() {
						tracing::warn!(target_region = %pair.target, "replace stopped the batch");
						report.aborted_at = Some(pair.target.clone());
						break;
					}
					let mut gone = HashSet::new();
					for nested_index in nested {
						delete_one(&working[nested_index], &mut gone, handler, &mut report);
					}
					report.replaced.push(pair.target.clone());
					working[index] = pair.clone();
					working.retain(|p| !gone.contains(&p.target));
				}
				Operation::Remove(target) => {
					let Some(index) = working.iter().position(|p| &p.target == target) else {
						continue;
					};
					let mut gone = HashSet::new();
					delete_cascading(&working, index, &mut gone, handler, tree, &mut report);
					working.retain(|p| !gone.contains(&p.target));
				}
				Operation::SetAll(_) => {
					tracing::debug!("ignoring declarative list inside incremental batch");
				}
			}
		}

		self.state = PairState::from_pairs(working);
		report
	}

	/// Drops `targets` from the applied state without any callback.
	///
	/// Returns `true` when something was removed.
	pub fn forget(&mut self, targets: &[RegionId]) -> bool {
		let before = self.state.len();
		self.state = self
			.state
			.iter()
			.filter(|p| !targets.contains(&p.target))
			.cloned()
			.collect();
		self.state.len() != before
	}
}

/// Indices of live pairs after `index` whose region is nested in `pairs[index]`.
fn nested_after(
	pairs: &[Pair],
	index: usize,
	gone: &HashSet<RegionId>,
	tree: &dyn RegionTree,
) -> Vec<usize> {
	let ancestor = &pairs[index].target;
	(index + 1..pairs.len())
		.filter(|&i| !gone.contains(&pairs[i].target) && tree.is_nested(ancestor, &pairs[i].target))
		.collect()
}

fn delete_one(
	pair: &Pair,
	gone: &mut HashSet<RegionId>,
	handler: &mut dyn PairHandler,
	report: &mut ApplyReport,
) {
	handler.on_delete(pair);
	gone.insert(pair.target.clone());
	report.deleted.push(pair.target.clone());
}

fn delete_cascading(
	pairs: &[Pair],
	index: usize,
	gone: &mut HashSet<RegionId>,
	handler: &mut dyn PairHandler,
	tree: &dyn RegionTree,
	report: &mut ApplyReport,
) {
	let nested = nested_after(pairs, index, gone, tree);
	for i in nested {
		delete_one(&pairs[i], gone, handler, report);
	}
	delete_one(&pairs[index], gone, handler, report);
}
