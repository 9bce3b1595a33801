//! Observer recording every hook call.

use fraglink_core::{ApplyReport, EngineObserver, Operation, PairState, RegionId};
use std::cell::RefCell;
use std::rc::Rc;

/// One hook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
	/// `before_diff` with the number of operations.
	BeforeDiff(usize),
	/// `after_diff` with the committed state.
	AfterDiff(PairState),
	/// `before_inject` for a region.
	BeforeInject(RegionId),
	/// `after_inject` for a region.
	AfterInject(RegionId),
}

/// Shared, cloneable observer appending to one event log.
///
/// An optional suffix is appended to every injected payload, which lets
/// tests check that observers can rewrite content.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
	events: Rc<RefCell<Vec<ObserverEvent>>>,
	suffix: Option<String>,
}

impl RecordingObserver {
	/// Creates an observer with an empty log.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `suffix` to every payload before injection.
	pub fn with_suffix(mut self, suffix: &str) -> Self {
		self.suffix = Some(suffix.to_string());
		self
	}

	/// Returns the recorded events.
	pub fn events(&self) -> Vec<ObserverEvent> {
		self.events.borrow().clone()
	}

	/// Returns the regions that went through `after_inject`, in order.
	pub fn injected(&self) -> Vec<RegionId> {
		self.events
			.borrow()
			.iter()
			.filter_map(|event| match event {
				ObserverEvent::AfterInject(target) => Some(target.clone()),
				_ => None,
			})
			.collect()
	}

	/// Clears the log.
	pub fn clear(&self) {
		self.events.borrow_mut().clear();
	}
}

impl EngineObserver for RecordingObserver {
	fn before_diff(&mut self, _current: &PairState, operations: &[Operation]) {
		self.events
			.borrow_mut()
			.push(ObserverEvent::BeforeDiff(operations.len()));
	}

	fn after_diff(&mut self, state: &PairState, _report: &ApplyReport) {
		self.events
			.borrow_mut()
			.push(ObserverEvent::AfterDiff(state.clone()));
	}

	fn before_inject(&mut self, target: &RegionId, content: &mut String) {
		if let Some(suffix) = &self.suffix {
			content.push_str(suffix);
		}
		self.events
			.borrow_mut()
			.push(ObserverEvent::BeforeInject(target.clone()));
	}

	fn after_inject(&mut self, target: &RegionId) {
		self.events
			.borrow_mut()
			.push(ObserverEvent::AfterInject(target.clone()));
	}
}
