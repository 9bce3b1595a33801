//! In-memory session history.

use fraglink_core::{ChangeHandler, History, HistoryEntry, HistoryError, SecondarySlot};
use std::cell::RefCell;
use std::rc::Rc;

/// One recorded write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryWrite {
	/// A new entry was pushed.
	Push(HistoryEntry, String),
	/// The current entry was rewritten.
	Replace(HistoryEntry, String),
}

impl HistoryWrite {
	/// Returns the address written.
	pub fn address(&self) -> &str {
		match self {
			Self::Push(_, address) | Self::Replace(_, address) => address,
		}
	}

	/// Returns `true` for a push.
	pub fn is_push(&self) -> bool {
		matches!(self, Self::Push(..))
	}
}

#[derive(Default)]
struct HistoryState {
	entries: Vec<(String, Option<HistoryEntry>)>,
	index: usize,
	writes: Vec<HistoryWrite>,
	handler: Option<ChangeHandler>,
	notifications: bool,
	notify_on_write: bool,
	failing: bool,
}

/// Shared, cloneable history double.
///
/// Behaves like a browser tab: following a link truncates the forward
/// entries and appends one without state, and traversals keep the state
/// written for each entry. Change notifications fire synchronously after
/// every simulated user action.
#[derive(Clone)]
pub struct MockHistory {
	state: Rc<RefCell<HistoryState>>,
}

impl std::fmt::Debug for MockHistory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.borrow();
		f.debug_struct("MockHistory")
			.field("entries", &state.entries)
			.field("index", &state.index)
			.finish()
	}
}

impl MockHistory {
	/// Opens a tab at `address`.
	pub fn new(address: &str) -> Self {
		Self {
			state: Rc::new(RefCell::new(HistoryState {
				entries: vec![(address.to_string(), None)],
				notifications: true,
				..Default::default()
			})),
		}
	}

	/// Simulates an environment without change notifications.
	pub fn without_notifications(self) -> Self {
		self.state.borrow_mut().notifications = false;
		self
	}

	/// Fires the change handler after the engine's own writes as well.
	pub fn notifying_writes(self) -> Self {
		self.state.borrow_mut().notify_on_write = true;
		self
	}

	/// Makes every following push or replace fail.
	pub fn set_failing(&self, failing: bool) {
		self.state.borrow_mut().failing = failing;
	}

	/// Follows a link to `address`.
	pub fn navigate(&self, address: &str) {
		{
			let mut state = self.state.borrow_mut();
			let keep = state.index + 1;
			state.entries.truncate(keep);
			state.entries.push((address.to_string(), None));
			state.index = keep;
		}
		self.notify();
	}

	/// Changes the address without notifying, as a typed address would in
	/// an environment without notifications.
	pub fn set_address(&self, address: &str) {
		let mut state = self.state.borrow_mut();
		let index = state.index;
		state.entries[index] = (address.to_string(), None);
	}

	/// Goes one entry back; returns `false` at the first entry.
	pub fn back(&self) -> bool {
		{
			let mut state = self.state.borrow_mut();
			if state.index == 0 {
				return false;
			}
			state.index -= 1;
		}
		self.notify();
		true
	}

	/// Goes one entry forward; returns `false` at the last entry.
	pub fn forward(&self) -> bool {
		{
			let mut state = self.state.borrow_mut();
			if state.index + 1 >= state.entries.len() {
				return false;
			}
			state.index += 1;
		}
		self.notify();
		true
	}

	/// Returns the live address.
	pub fn address(&self) -> String {
		let state = self.state.borrow();
		state.entries[state.index].0.clone()
	}

	/// Returns the state of the current entry.
	pub fn entry(&self) -> Option<HistoryEntry> {
		let state = self.state.borrow();
		state.entries[state.index].1.clone()
	}

	/// Returns the number of entries.
	pub fn len(&self) -> usize {
		self.state.borrow().entries.len()
	}

	/// Returns `true` when there is no entry, which never happens.
	pub fn is_empty(&self) -> bool {
		self.state.borrow().entries.is_empty()
	}

	/// Returns the current entry index.
	pub fn index(&self) -> usize {
		self.state.borrow().index
	}

	/// Returns every write made through the [`History`] trait.
	pub fn writes(&self) -> Vec<HistoryWrite> {
		self.state.borrow().writes.clone()
	}

	/// Returns the number of pushes made through the [`History`] trait.
	pub fn push_count(&self) -> usize {
		self.state.borrow().writes.iter().filter(|w| w.is_push()).count()
	}

	/// Returns `true` once a handler was subscribed.
	pub fn is_subscribed(&self) -> bool {
		self.state.borrow().handler.is_some()
	}

	fn notify(&self) {
		let handler = {
			let mut state = self.state.borrow_mut();
			if !state.notifications {
				return;
			}
			state.handler.take()
		};
		if let Some(mut handler) = handler {
			handler();
			let mut state = self.state.borrow_mut();
			if state.handler.is_none() {
				state.handler = Some(handler);
			}
		}
	}

	fn write(&mut self, write: HistoryWrite, push: bool) -> Result<(), HistoryError> {
		let notify = {
			let mut state = self.state.borrow_mut();
			if state.failing {
				return Err(HistoryError::new("history is not writable"));
			}
			let (entry, address) = match &write {
				HistoryWrite::Push(entry, address) | HistoryWrite::Replace(entry, address) => {
					(entry.clone(), address.clone())
				}
			};
			if push {
				let keep = state.index + 1;
				state.entries.truncate(keep);
				state.entries.push((address, Some(entry)));
				state.index = keep;
			} else {
				let index = state.index;
				state.entries[index] = (address, Some(entry));
			}
			state.writes.push(write);
			state.notify_on_write
		};
		if notify {
			self.notify();
		}
		Ok(())
	}
}

impl History for MockHistory {
	fn push_entry(&mut self, entry: &HistoryEntry, address: &str) -> Result<(), HistoryError> {
		self.write(HistoryWrite::Push(entry.clone(), address.to_string()), true)
	}

	fn replace_entry(&mut self, entry: &HistoryEntry, address: &str) -> Result<(), HistoryError> {
		self.write(HistoryWrite::Replace(entry.clone(), address.to_string()), false)
	}

	fn subscribe(&mut self, handler: ChangeHandler) -> bool {
		let mut state = self.state.borrow_mut();
		if !state.notifications {
			return false;
		}
		state.handler = Some(handler);
		true
	}

	fn current_address(&self) -> String {
		self.address()
	}

	fn current_entry(&self) -> Option<HistoryEntry> {
		self.entry()
	}
}

/// Secondary slot recording every mirrored address.
#[derive(Debug, Clone, Default)]
pub struct MockSlot {
	mirrored: Rc<RefCell<Vec<String>>>,
}

impl MockSlot {
	/// Creates an empty slot.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the mirrored addresses, oldest first.
	pub fn mirrored(&self) -> Vec<String> {
		self.mirrored.borrow().clone()
	}
}

impl SecondarySlot for MockSlot {
	fn mirror(&mut self, address: &str) {
		self.mirrored.borrow_mut().push(address.to_string());
	}
}
