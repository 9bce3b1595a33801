//! One-shot completion shared by a request and its timeout timer.

use fraglink_core::{FetchCallback, FetchOutcome};
use std::cell::RefCell;
use std::rc::Rc;

type Disarm = Box<dyn FnOnce()>;

#[derive(Default)]
struct Slots {
	done: Option<FetchCallback>,
	disarm: Option<Disarm>,
}

/// Reports a fetch outcome at most once.
///
/// Whichever side finishes first wins; the disarm hook runs before the
/// callback so the losing side (usually the timer) is cancelled.
#[derive(Clone)]
pub(crate) struct Settle(Rc<RefCell<Slots>>);

impl Settle {
	pub(crate) fn new(done: FetchCallback) -> Self {
		Self(Rc::new(RefCell::new(Slots {
			done: Some(done),
			disarm: None,
		})))
	}

	/// Installs the hook cancelling the competing side.
	///
	/// Runs it right away when the outcome is already reported.
	pub(crate) fn arm(&self, disarm: impl FnOnce() + 'static) {
		let mut slots = self.0.borrow_mut();
		if slots.done.is_none() {
			drop(slots);
			disarm();
			return;
		}
		slots.disarm = Some(Box::new(disarm));
	}

	pub(crate) fn finish(&self, outcome: FetchOutcome) {
		let (done, disarm) = {
			let mut slots = self.0.borrow_mut();
			(slots.done.take(), slots.disarm.take())
		};
		if let Some(disarm) = disarm {
			disarm();
		}
		if let Some(done) = done {
			done(outcome);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::Cell;

	fn recorder() -> (Rc<RefCell<Vec<FetchOutcome>>>, FetchCallback) {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = Rc::clone(&seen);
		(seen, Box::new(move |outcome| sink.borrow_mut().push(outcome)))
	}

	#[rstest]
	fn test_first_outcome_wins_and_disarms_timer() {
		let (seen, done) = recorder();
		let cleared = Rc::new(Cell::new(0));
		let settle = Settle::new(done);
		let counter = Rc::clone(&cleared);
		settle.arm(move || counter.set(counter.get() + 1));

		settle.finish(FetchOutcome::Success("body".into()));
		settle.finish(FetchOutcome::Timeout);

		assert_eq!(*seen.borrow(), vec![FetchOutcome::Success("body".into())]);
		assert_eq!(cleared.get(), 1);
	}

	#[rstest]
	fn test_arming_after_finish_disarms_at_once() {
		let (seen, done) = recorder();
		let settle = Settle::new(done);
		settle.finish(FetchOutcome::Error(0));
		let cleared = Rc::new(Cell::new(false));
		let flag = Rc::clone(&cleared);

		settle.arm(move || flag.set(true));

		assert!(cleared.get());
		assert_eq!(seen.borrow().len(), 1);
	}
}
