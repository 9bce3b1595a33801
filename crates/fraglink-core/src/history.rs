//! Session history bridging.
//!
//! The [`HistoryBridge`] wraps a [`History`] collaborator and adds what the
//! engine needs on top of raw push/replace:
//!
//! - a navigation `level` stored with every entry, incremented once per
//!   forward navigation and read back on traversal;
//! - silent updates: the address about to be written is recorded as "last
//!   seen" first, so the change notification caused by the engine's own write
//!   is recognized and ignored;
//! - a polling fallback with a failure ceiling for environments without
//!   change notifications;
//! - an optional [`SecondarySlot`] that mirrors every address write into an
//!   invisible navigable context.

use crate::error::HistoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque state stored with each history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
	/// Navigation depth.
	pub level: u64,
	/// Canonical encoded pairs at that depth.
	pub encoded_pairs: String,
}

impl HistoryEntry {
	/// Creates an entry.
	pub fn new(level: u64, encoded_pairs: impl Into<String>) -> Self {
		Self {
			level,
			encoded_pairs: encoded_pairs.into(),
		}
	}
}

/// Handler invoked on address-change notifications.
pub type ChangeHandler = Box<dyn FnMut()>;

/// Session history primitives.
pub trait History {
	/// Pushes a new entry and makes `address` visible.
	fn push_entry(&mut self, entry: &HistoryEntry, address: &str) -> Result<(), HistoryError>;

	/// Rewrites the current entry and makes `address` visible.
	fn replace_entry(&mut self, entry: &HistoryEntry, address: &str) -> Result<(), HistoryError>;

	/// Registers the change handler.
	///
	/// Returns `false` when the environment cannot notify address changes;
	/// the engine then falls back to polling.
	fn subscribe(&mut self, handler: ChangeHandler) -> bool;

	/// Returns the live address.
	fn current_address(&self) -> String;

	/// Returns the state stored with the current entry, if the engine wrote one.
	fn current_entry(&self) -> Option<HistoryEntry>;
}

/// Invisible navigable context mirroring the primary address.
pub trait SecondarySlot {
	/// Records `address` as a new entry of the mirror.
	fn mirror(&mut self, address: &str);
}

/// Polling fallback settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
	/// Delay between two polls.
	pub interval: Duration,
	/// Failures tolerated in one polling run before polling stops.
	pub max_failures: u32,
}

impl Default for PollSettings {
	fn default() -> Self {
		Self {
			interval: Duration::from_millis(100),
			max_failures: 10,
		}
	}
}

/// Wraps a [`History`] with levels, silent updates, polling and mirroring.
pub struct HistoryBridge<H: History> {
	history: H,
	level: u64,
	last_seen: Option<String>,
	poll: PollSettings,
	polling: bool,
	poll_failures: u32,
	slot: Option<Box<dyn SecondarySlot>>,
	mirror_suppressed: bool,
}

impl<H: History> fmt::Debug for HistoryBridge<H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HistoryBridge")
			.field("level", &self.level)
			.field("last_seen", &self.last_seen)
			.field("polling", &self.polling)
			.field("poll_failures", &self.poll_failures)
			.field("has_slot", &self.slot.is_some())
			.finish()
	}
}

impl<H: History> HistoryBridge<H> {
	/// Wraps `history`.
	pub fn new(history: H, poll: PollSettings) -> Self {
		Self {
			history,
			level: 0,
			last_seen: None,
			poll,
			polling: false,
			poll_failures: 0,
			slot: None,
			mirror_suppressed: false,
		}
	}

	/// Returns the wrapped history.
	pub fn history(&self) -> &H {
		&self.history
	}

	/// Returns the wrapped history mutably.
	pub fn history_mut(&mut self) -> &mut H {
		&mut self.history
	}

	/// Returns the current navigation level.
	pub fn level(&self) -> u64 {
		self.level
	}

	/// Returns the live address.
	pub fn current_address(&self) -> String {
		self.history.current_address()
	}

	/// Returns the last address written or acknowledged.
	pub fn last_seen(&self) -> Option<&str> {
		self.last_seen.as_deref()
	}

	/// Returns `true` when `address` is the engine's own last write.
	pub fn is_own_write(&self, address: &str) -> bool {
		self.last_seen.as_deref() == Some(address)
	}

	/// Records `address` as seen without writing it.
	pub fn mark_seen(&mut self, address: impl Into<String>) {
		self.last_seen = Some(address.into());
	}

	/// Adopts the level stored with a traversed entry.
	pub fn adopt(&mut self, entry: &HistoryEntry) {
		self.level = entry.level;
	}

	/// Pushes a new entry one level deeper.
	pub fn push(&mut self, encoded: &str, address: &str) -> Result<HistoryEntry, HistoryError> {
		let entry = HistoryEntry::new(self.level + 1, encoded);
		self.mark_seen(address);
		self.history.push_entry(&entry, address)?;
		self.level = entry.level;
		self.mirror(address);
		Ok(entry)
	}

	/// Rewrites the current entry one level deeper.
	///
	/// Used when the environment already created the entry (a followed
	/// link) and the engine only canonicalizes and stamps it.
	pub fn stamp(&mut self, encoded: &str, address: &str) -> Result<HistoryEntry, HistoryError> {
		let entry = HistoryEntry::new(self.level + 1, encoded);
		self.mark_seen(address);
		self.history.replace_entry(&entry, address)?;
		self.level = entry.level;
		self.mirror(address);
		Ok(entry)
	}

	/// Rewrites the current entry at the current level.
	pub fn replace(&mut self, encoded: &str, address: &str) -> Result<HistoryEntry, HistoryError> {
		let entry = HistoryEntry::new(self.level, encoded);
		self.mark_seen(address);
		self.history.replace_entry(&entry, address)?;
		self.mirror(address);
		Ok(entry)
	}

	/// Installs the secondary history slot.
	pub fn attach_slot(&mut self, slot: Box<dyn SecondarySlot>) {
		self.slot = Some(slot);
	}

	/// Returns `true` when a secondary slot is installed.
	pub fn has_slot(&self) -> bool {
		self.slot.is_some()
	}

	/// Suppresses or re-enables mirroring.
	pub fn set_mirror_suppressed(&mut self, suppressed: bool) {
		self.mirror_suppressed = suppressed;
	}

	fn mirror(&mut self, address: &str) {
		if self.mirror_suppressed {
			return;
		}
		if let Some(slot) = self.slot.as_mut() {
			slot.mirror(address);
		}
	}

	/// Starts a polling run and resets its failure counter.
	pub fn start_polling(&mut self) {
		self.polling = true;
		self.poll_failures = 0;
	}

	/// Stops polling.
	pub fn stop_polling(&mut self) {
		self.polling = false;
	}

	/// Returns `true` while polling is active.
	pub fn is_polling(&self) -> bool {
		self.polling
	}

	/// Returns the poll settings.
	pub fn poll_settings(&self) -> PollSettings {
		self.poll
	}

	/// Returns the live address when polling is active and it differs from
	/// the last seen one.
	pub fn poll_change(&self) -> Option<String> {
		if !self.polling {
			return None;
		}
		let address = self.history.current_address();
		(!self.is_own_write(&address)).then_some(address)
	}

	/// Counts a failed poll; returns `false` once polling was stopped.
	pub fn record_poll_failure(&mut self, error: &dyn std::error::Error) -> bool {
		self.poll_failures += 1;
		tracing::warn!(
			failures = self.poll_failures,
			max = self.poll.max_failures,
			%error,
			"address poll failed"
		);
		if self.poll_failures >= self.poll.max_failures {
			tracing::error!("too many poll failures, polling disabled");
			self.polling = false;
		}
		self.polling
	}
}
