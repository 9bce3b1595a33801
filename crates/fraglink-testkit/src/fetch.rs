//! Scripted transport.

use fraglink_core::{FetchCallback, FetchOutcome, FetchRequest, Fetcher, RegionId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// When [`MockFetcher`] completes requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
	/// From inside [`Fetcher::fetch`].
	Immediate,
	/// When the test calls one of the `complete*` methods.
	Manual,
}

struct Pending {
	request: FetchRequest,
	done: FetchCallback,
}

struct FetchState {
	mode: FetchMode,
	responses: HashMap<String, FetchOutcome>,
	requests: Vec<FetchRequest>,
	pending: Vec<Pending>,
}

/// Shared, cloneable transport double.
///
/// Locators without a scripted response answer `<p>{locator}</p>`.
#[derive(Clone)]
pub struct MockFetcher {
	state: Rc<RefCell<FetchState>>,
}

impl std::fmt::Debug for MockFetcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.borrow();
		f.debug_struct("MockFetcher")
			.field("mode", &state.mode)
			.field("requests", &state.requests.len())
			.field("pending", &state.pending.len())
			.finish()
	}
}

impl MockFetcher {
	fn with_mode(mode: FetchMode) -> Self {
		Self {
			state: Rc::new(RefCell::new(FetchState {
				mode,
				responses: HashMap::new(),
				requests: Vec::new(),
				pending: Vec::new(),
			})),
		}
	}

	/// Completes every request synchronously.
	pub fn immediate() -> Self {
		Self::with_mode(FetchMode::Immediate)
	}

	/// Holds every request until the test completes it.
	pub fn manual() -> Self {
		Self::with_mode(FetchMode::Manual)
	}

	/// Scripts the outcome for `locator`.
	pub fn respond(&self, locator: &str, outcome: FetchOutcome) -> &Self {
		self.state
			.borrow_mut()
			.responses
			.insert(locator.to_string(), outcome);
		self
	}

	/// Scripts successful content for `locator`.
	pub fn respond_with(&self, locator: &str, content: &str) -> &Self {
		self.respond(locator, FetchOutcome::Success(content.to_string()))
	}

	/// Returns every request issued so far.
	pub fn requests(&self) -> Vec<FetchRequest> {
		self.state.borrow().requests.clone()
	}

	/// Returns the locators requested so far.
	pub fn requested_locators(&self) -> Vec<String> {
		self.state
			.borrow()
			.requests
			.iter()
			.map(|r| r.locator.clone())
			.collect()
	}

	/// Returns the targets of the requests still waiting.
	pub fn pending(&self) -> Vec<RegionId> {
		self.state
			.borrow()
			.pending
			.iter()
			.map(|p| p.request.target.clone())
			.collect()
	}

	/// Completes the oldest pending request for `target` with its scripted
	/// outcome. Returns `false` when nothing was pending.
	pub fn complete(&self, target: &str) -> bool {
		let Some(pending) = self.take(target) else {
			return false;
		};
		let outcome = self.outcome_for(&pending.request.locator);
		(pending.done)(outcome);
		true
	}

	/// Completes the oldest pending request for `target` with `outcome`.
	pub fn complete_with(&self, target: &str, outcome: FetchOutcome) -> bool {
		let Some(pending) = self.take(target) else {
			return false;
		};
		(pending.done)(outcome);
		true
	}

	/// Completes every pending request, oldest first.
	pub fn complete_all(&self) -> usize {
		let drained: Vec<Pending> = self.state.borrow_mut().pending.drain(..).collect();
		let count = drained.len();
		for pending in drained {
			let outcome = self.outcome_for(&pending.request.locator);
			(pending.done)(outcome);
		}
		count
	}

	fn take(&self, target: &str) -> Option<Pending> {
		let mut state = self.state.borrow_mut();
		let index = state.pending.iter().position(|p| p.request.target == target)?;
		Some(state.pending.remove(index))
	}

	fn outcome_for(&self, locator: &str) -> FetchOutcome {
		self.state
			.borrow()
			.responses
			.get(locator)
			.cloned()
			.unwrap_or_else(|| FetchOutcome::Success(format!("<p>{}</p>", locator)))
	}
}

impl Fetcher for MockFetcher {
	fn fetch(&mut self, request: FetchRequest, done: FetchCallback) {
		let mode = {
			let mut state = self.state.borrow_mut();
			state.requests.push(request.clone());
			state.mode
		};
		match mode {
			FetchMode::Immediate => {
				let outcome = self.outcome_for(&request.locator);
				done(outcome);
			}
			FetchMode::Manual => self.state.borrow_mut().pending.push(Pending { request, done }),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::time::Duration;

	fn request(target: &str, locator: &str) -> FetchRequest {
		FetchRequest {
			target: RegionId::new(target),
			locator: locator.to_string(),
			method: "GET".to_string(),
			asynchronous: true,
			timeout: Duration::from_secs(30),
		}
	}

	#[rstest]
	fn test_manual_completion_uses_script() {
		let mut fetcher = MockFetcher::manual();
		fetcher.respond("a.html", FetchOutcome::Error(404));
		let seen = Rc::new(RefCell::new(None));
		let sink = Rc::clone(&seen);

		fetcher.fetch(
			request("main", "a.html"),
			Box::new(move |outcome| *sink.borrow_mut() = Some(outcome)),
		);
		assert!(seen.borrow().is_none());
		assert_eq!(fetcher.pending(), vec![RegionId::new("main")]);

		assert!(fetcher.complete("main"));
		assert_eq!(*seen.borrow(), Some(FetchOutcome::Error(404)));
		assert!(!fetcher.complete("main"));
	}

	#[rstest]
	fn test_immediate_completion_defaults_to_locator_markup() {
		let mut fetcher = MockFetcher::immediate();
		let seen = Rc::new(RefCell::new(None));
		let sink = Rc::clone(&seen);

		fetcher.fetch(
			request("main", "a.html"),
			Box::new(move |outcome| *sink.borrow_mut() = Some(outcome)),
		);

		assert_eq!(
			*seen.borrow(),
			Some(FetchOutcome::Success("<p>a.html</p>".to_string()))
		);
		assert_eq!(fetcher.requested_locators(), vec!["a.html"]);
	}
}
