//! Composition root.
//!
//! [`Engine`] wires the codec, the pair store, the content reconciler and the
//! history bridge together and runs one *cycle* per address change:
//!
//! 1. decode the live address into operations,
//! 2. diff them against the applied state, restoring default content for
//!    deleted regions and collecting one fetch per bound region,
//! 3. record the expected keys and issue the fetches,
//! 4. write the canonical address back (push, stamp or silent replace).
//!
//! Fetch completions are queued in a mailbox and delivered to the reconciler
//! outside of any running cycle, so a fetcher may complete synchronously from
//! inside [`Fetcher::fetch`]. A change notified while a cycle is running is
//! dropped; the engine's own writes are recognized through the bridge's
//! last-seen address and never start a cycle.
//!
//! The engine is single-threaded: handles are cheap [`Rc`] clones and every
//! collaborator is driven from the thread that owns the engine.

use crate::codec::{Operation, UrlCodec};
use crate::config::EngineConfig;
use crate::dom::{Dom, DomTree};
use crate::error::{EngineError, EngineResult};
use crate::fetch::{FetchOutcome, FetchRequest, Fetcher};
use crate::history::{History, HistoryBridge, HistoryEntry, PollSettings, SecondarySlot};
use crate::observer::{EngineObserver, Observers};
use crate::pair::{Pair, PairState, RegionId, Resource};
use crate::reconciler::ContentReconciler;
use crate::store::{ApplyReport, Nesting, PairHandler, PairStore};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
	/// The address present when the engine started.
	Initial,
	/// A change notification from the environment.
	Notification,
	/// A change detected by the polling fallback.
	Poll,
	/// A call to [`Engine::set_region`], [`Engine::remove_region`] or
	/// [`Engine::change_all`].
	Programmatic,
	/// A traversal of the secondary history slot.
	Secondary,
}

/// Outcome of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
	/// What started the cycle.
	pub origin: Origin,
	/// Transitions the store applied.
	pub applied: ApplyReport,
	/// Regions whose content was requested, in request order.
	pub requested: Vec<RegionId>,
	/// Address written to history, `None` when history was left untouched.
	pub address: Option<String>,
	/// Navigation level after the cycle.
	pub level: u64,
}

struct Completion {
	target: RegionId,
	locator: String,
	outcome: FetchOutcome,
}

#[derive(Debug, Clone, Default)]
struct View {
	state: PairState,
	level: u64,
	polling: bool,
}

struct Inner<D: Dom, F: Fetcher, H: History> {
	config: EngineConfig,
	codec: Box<dyn UrlCodec>,
	dom: D,
	fetcher: F,
	bridge: HistoryBridge<H>,
	store: PairStore,
	reconciler: ContentReconciler,
	observers: Observers,
	subscribed: bool,
}

struct Shared<D: Dom, F: Fetcher, H: History> {
	inner: RefCell<Inner<D, F, H>>,
	mailbox: RefCell<VecDeque<Completion>>,
	treating: Cell<bool>,
	view: RefCell<View>,
	poll: PollSettings,
}

/// Marks the engine busy for as long as it lives.
struct Treatment<'a>(&'a Cell<bool>);

impl<'a> Treatment<'a> {
	fn enter(flag: &'a Cell<bool>) -> Option<Self> {
		if flag.get() {
			return None;
		}
		flag.set(true);
		Some(Self(flag))
	}
}

impl Drop for Treatment<'_> {
	fn drop(&mut self) {
		self.0.set(false);
	}
}

/// Handle to a running synchronization engine.
///
/// # Example
///
/// ```ignore
/// let engine = Engine::new(EngineConfig::default(), dom, fetcher, history)?;
/// engine.start()?;
/// engine.set_region("main", "page2.html")?;
/// ```
pub struct Engine<D: Dom, F: Fetcher, H: History> {
	shared: Rc<Shared<D, F, H>>,
}

impl<D: Dom, F: Fetcher, H: History> Clone for Engine<D, F, H> {
	fn clone(&self) -> Self {
		Self {
			shared: Rc::clone(&self.shared),
		}
	}
}

impl<D: Dom, F: Fetcher, H: History> fmt::Debug for Engine<D, F, H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let view = self.shared.view.borrow();
		f.debug_struct("Engine")
			.field("state", &view.state)
			.field("level", &view.level)
			.field("polling", &view.polling)
			.finish()
	}
}

/// Non-owning engine handle held by callbacks.
pub struct WeakEngine<D: Dom, F: Fetcher, H: History> {
	shared: Weak<Shared<D, F, H>>,
}

impl<D: Dom, F: Fetcher, H: History> Clone for WeakEngine<D, F, H> {
	fn clone(&self) -> Self {
		Self {
			shared: Weak::clone(&self.shared),
		}
	}
}

impl<D: Dom, F: Fetcher, H: History> WeakEngine<D, F, H> {
	/// Returns the engine if it is still alive.
	pub fn upgrade(&self) -> Option<Engine<D, F, H>> {
		self.shared.upgrade().map(|shared| Engine { shared })
	}

	/// Returns the engine, or [`EngineError::Detached`] once it was dropped.
	pub fn engine(&self) -> EngineResult<Engine<D, F, H>> {
		self.upgrade().ok_or(EngineError::Detached)
	}
}

impl<D, F, H> Engine<D, F, H>
where
	D: Dom + 'static,
	F: Fetcher + 'static,
	H: History + 'static,
{
	/// Creates an engine; nothing is read or written until [`start`](Self::start).
	pub fn new(config: EngineConfig, dom: D, fetcher: F, history: H) -> EngineResult<Self> {
		config.validate()?;
		let poll = config.poll_settings();
		tracing::debug!(grammar = %config.grammar, "creating engine");
		let inner = Inner {
			codec: config.grammar.codec(),
			bridge: HistoryBridge::new(history, poll),
			config,
			dom,
			fetcher,
			store: PairStore::new(),
			reconciler: ContentReconciler::new(),
			observers: Observers::new(),
			subscribed: false,
		};
		Ok(Self {
			shared: Rc::new(Shared {
				inner: RefCell::new(inner),
				mailbox: RefCell::new(VecDeque::new()),
				treating: Cell::new(false),
				view: RefCell::new(View::default()),
				poll,
			}),
		})
	}

	/// Returns a non-owning handle.
	pub fn downgrade(&self) -> WeakEngine<D, F, H> {
		WeakEngine {
			shared: Rc::downgrade(&self.shared),
		}
	}

	/// Appends an observer; observers run in registration order.
	pub fn observe(&self, observer: impl EngineObserver + 'static) -> EngineResult<()> {
		let mut inner = self.shared.inner.try_borrow_mut().map_err(|_| EngineError::Busy)?;
		inner.observers.push(Box::new(observer));
		Ok(())
	}

	/// Installs the secondary history slot mirroring every address write.
	pub fn attach_slot(&self, slot: impl SecondarySlot + 'static) -> EngineResult<()> {
		let mut inner = self.shared.inner.try_borrow_mut().map_err(|_| EngineError::Busy)?;
		if !inner.config.secondary_slot {
			tracing::debug!("secondary slot attached although disabled in configuration");
		}
		inner.bridge.attach_slot(Box::new(slot));
		Ok(())
	}

	/// Subscribes to address changes and processes the initial address.
	///
	/// When the environment cannot notify changes and polling is enabled,
	/// polling starts; the host then drives [`poll`](Self::poll) every
	/// [`poll_interval`](Self::poll_interval).
	pub fn start(&self) -> EngineResult<CycleReport> {
		self.treat(|inner, weak| {
			if !inner.subscribed {
				inner.subscribe(weak);
			}
			let live = inner.bridge.current_address();
			let entry = inner.bridge.history().current_entry();
			let Some(operations) = inner.codec.decode_address(&live) else {
				inner.bridge.mark_seen(live);
				return Ok(inner.untouched(Origin::Initial));
			};
			inner.run_cycle(operations, Origin::Initial, &live, entry, weak)
		})?
		.ok_or(EngineError::Busy)
	}

	/// Processes a change notification.
	///
	/// Returns `Ok(None)` when the change was the engine's own write, touched
	/// nothing the engine owns, or arrived while another change was running.
	pub fn handle_address_change(&self) -> EngineResult<Option<CycleReport>> {
		let report = self.treat(|inner, weak| inner.follow_address(Origin::Notification, weak))?;
		Ok(report.flatten())
	}

	/// Runs one poll of the fallback loop.
	///
	/// A failing cycle counts towards the failure ceiling; once it is hit,
	/// [`is_polling`](Self::is_polling) turns `false` and the host should
	/// stop calling.
	pub fn poll(&self) -> EngineResult<Option<CycleReport>> {
		let report = self.treat(|inner, weak| {
			if inner.bridge.poll_change().is_none() {
				return Ok(None);
			}
			let result = inner.follow_address(Origin::Poll, weak);
			if let Err(error) = &result {
				inner.bridge.record_poll_failure(error);
			}
			result
		})?;
		Ok(report.flatten())
	}

	/// Binds `target` to `resource` and records a new history entry.
	pub fn set_region(
		&self,
		target: impl Into<RegionId>,
		resource: impl Into<Resource>,
	) -> EngineResult<CycleReport> {
		let operation = Operation::Add(Pair::new(target, resource));
		self.programmatic(move |_| vec![operation])
	}

	/// Unbinds `target` and records a new history entry.
	pub fn remove_region(&self, target: impl Into<RegionId>) -> EngineResult<CycleReport> {
		let operation = Operation::Remove(target.into());
		self.programmatic(move |_| vec![operation])
	}

	/// Replaces the whole state with the pairs of `fragment` and records a
	/// new history entry. The fragment may omit the grammar's prefix.
	pub fn change_all(&self, fragment: &str) -> EngineResult<CycleReport> {
		self.programmatic(|codec| codec.decode(fragment))
	}

	/// Processes a traversal of the secondary history slot to `address`.
	///
	/// The primary address is rewritten in place; mirroring stays off while
	/// the cycle runs so the slot does not record its own traversal.
	pub fn handle_secondary_traversal(&self, address: &str) -> EngineResult<Option<CycleReport>> {
		let report = self.treat(|inner, weak| {
			if inner.bridge.is_own_write(address) {
				return Ok(None);
			}
			let Some(operations) = inner.codec.decode_address(address) else {
				return Ok(None);
			};
			inner.bridge.set_mirror_suppressed(true);
			let result = inner.run_cycle(operations, Origin::Secondary, address, None, weak);
			inner.bridge.set_mirror_suppressed(false);
			result.map(Some)
		})?;
		Ok(report.flatten())
	}

	/// Injects buffered content whose node appeared since it arrived.
	///
	/// Returns the regions injected.
	pub fn drain(&self) -> EngineResult<Vec<RegionId>> {
		self.treat(|inner, _| {
			let arrival = inner.reconciler.drain(&mut inner.dom, &mut inner.observers);
			inner.heal(&arrival.not_found)?;
			Ok(arrival.injected)
		})?
		.ok_or(EngineError::Busy)
	}

	/// Returns the applied state as of the last completed cycle.
	pub fn state(&self) -> PairState {
		self.shared.view.borrow().state.clone()
	}

	/// Returns the navigation level as of the last completed cycle.
	pub fn level(&self) -> u64 {
		self.shared.view.borrow().level
	}

	/// Returns `true` while the polling fallback is active.
	pub fn is_polling(&self) -> bool {
		self.shared.view.borrow().polling
	}

	/// Delay the host should wait between two [`poll`](Self::poll) calls.
	pub fn poll_interval(&self) -> std::time::Duration {
		self.shared.poll.interval
	}

	/// Returns `true` while a change is being processed.
	pub fn is_busy(&self) -> bool {
		self.shared.treating.get()
	}

	fn programmatic(
		&self,
		operations: impl FnOnce(&dyn UrlCodec) -> Vec<Operation>,
	) -> EngineResult<CycleReport> {
		self.treat(|inner, weak| {
			let operations = operations(inner.codec.as_ref());
			let live = inner.bridge.current_address();
			inner.run_cycle(operations, Origin::Programmatic, &live, None, weak)
		})?
		.ok_or(EngineError::Busy)
	}

	/// Runs `f` with the engine marked busy, then delivers queued completions.
	///
	/// Returns `Ok(None)` without running `f` when the engine is already busy.
	fn treat<T>(
		&self,
		f: impl FnOnce(&mut Inner<D, F, H>, &WeakEngine<D, F, H>) -> EngineResult<T>,
	) -> EngineResult<Option<T>> {
		let Some(_treatment) = Treatment::enter(&self.shared.treating) else {
			tracing::debug!("change arrived while another one is running, dropping it");
			return Ok(None);
		};
		let weak = self.downgrade();
		let result = {
			let mut inner = self
				.shared
				.inner
				.try_borrow_mut()
				.map_err(|_| EngineError::Busy)?;
			f(&mut inner, &weak)
		};
		self.flush_completions();
		result.map(Some)
	}

	fn receive(&self, completion: Completion) {
		self.shared.mailbox.borrow_mut().push_back(completion);
		// A running cycle flushes the mailbox itself once it is done.
		let Some(_treatment) = Treatment::enter(&self.shared.treating) else {
			return;
		};
		self.flush_completions();
	}

	fn flush_completions(&self) {
		loop {
			let next = self.shared.mailbox.borrow_mut().pop_front();
			let Some(completion) = next else {
				break;
			};
			let Ok(mut inner) = self.shared.inner.try_borrow_mut() else {
				self.shared.mailbox.borrow_mut().push_front(completion);
				break;
			};
			if let Err(error) = inner.complete(completion) {
				tracing::error!(%error, "failed to rewrite address after dropping regions");
			}
		}
		self.refresh_view();
	}

	fn refresh_view(&self) {
		let Ok(inner) = self.shared.inner.try_borrow() else {
			return;
		};
		let mut view = self.shared.view.borrow_mut();
		view.state = inner.store.state().clone();
		view.level = inner.bridge.level();
		view.polling = inner.bridge.is_polling();
	}
}

impl<D, F, H> Inner<D, F, H>
where
	D: Dom + 'static,
	F: Fetcher + 'static,
	H: History + 'static,
{
	fn subscribe(&mut self, weak: &WeakEngine<D, F, H>) {
		let weak = weak.clone();
		let notified = self.bridge.history_mut().subscribe(Box::new(move || {
			let Some(engine) = weak.upgrade() else {
				return;
			};
			if let Err(error) = engine.handle_address_change() {
				tracing::error!(%error, "failed to process address change");
			}
		}));
		self.subscribed = true;
		if notified {
			return;
		}
		if self.config.polling.enabled {
			tracing::info!(
				interval_ms = self.config.polling.interval_ms,
				"address changes are not notified, polling instead"
			);
			self.bridge.start_polling();
		} else {
			tracing::warn!("address changes are not notified and polling is disabled");
		}
	}

	fn untouched(&self, origin: Origin) -> CycleReport {
		CycleReport {
			origin,
			applied: ApplyReport::default(),
			requested: Vec::new(),
			address: None,
			level: self.bridge.level(),
		}
	}

	fn follow_address(
		&mut self,
		origin: Origin,
		weak: &WeakEngine<D, F, H>,
	) -> EngineResult<Option<CycleReport>> {
		let live = self.bridge.current_address();
		if self.bridge.is_own_write(&live) {
			tracing::trace!(address = %live, "ignoring own write");
			return Ok(None);
		}
		let Some(operations) = self.codec.decode_address(&live) else {
			tracing::debug!(address = %live, "address carries no pairs, leaving it alone");
			self.bridge.mark_seen(live);
			return Ok(None);
		};
		let entry = self.bridge.history().current_entry();
		self.run_cycle(operations, origin, &live, entry, weak).map(Some)
	}

	fn run_cycle(
		&mut self,
		operations: Vec<Operation>,
		origin: Origin,
		live: &str,
		entry: Option<HistoryEntry>,
		weak: &WeakEngine<D, F, H>,
	) -> EngineResult<CycleReport> {
		let span = tracing::debug_span!("cycle", ?origin, address = %live);
		let _enter = span.enter();

		self.observers.before_diff(self.store.state(), &operations);
		let nesting = Nesting::capture(self.store.state(), &DomTree(&self.dom));
		let declarative = operations
			.iter()
			.any(|op| matches!(op, Operation::SetAll(_)));

		let mut handler = CycleHandler {
			dom: &mut self.dom,
			reconciler: &mut self.reconciler,
			observers: &mut self.observers,
			config: &self.config,
			requests: Vec::new(),
		};
		let applied = self.store.apply(&operations, &mut handler, &nesting);
		let requests = handler.requests;
		let requested: Vec<RegionId> = requests.iter().map(|r| r.target.clone()).collect();

		if declarative {
			// Keys still in flight from an earlier cycle stay expected;
			// regions bound to their default content expect nothing.
			let keys = self
				.store
				.state()
				.iter()
				.filter(|p| matches!(p.resource, Resource::Locator(_)))
				.map(|p| &p.target)
				.filter(|t| requested.contains(t) || self.reconciler.is_pending(t.as_str()))
				.cloned()
				.collect();
			self.reconciler.set_keys(keys);
		} else {
			self.reconciler.forget_keys(&applied.deleted);
			self.reconciler.extend_keys(requested.iter().cloned());
		}
		self.observers.after_diff(self.store.state(), &applied);

		for request in requests {
			self.issue(request, weak);
		}

		let address = self.write_address(&applied, origin, live, entry)?;
		tracing::debug!(
			added = applied.added.len(),
			replaced = applied.replaced.len(),
			deleted = applied.deleted.len(),
			level = self.bridge.level(),
			"cycle done"
		);
		Ok(CycleReport {
			origin,
			applied,
			requested,
			address,
			level: self.bridge.level(),
		})
	}

	fn issue(&mut self, request: FetchRequest, weak: &WeakEngine<D, F, H>) {
		tracing::debug!(target_region = %request.target, locator = %request.locator, "requesting content");
		let target = request.target.clone();
		let locator = request.locator.clone();
		let weak = weak.clone();
		self.fetcher.fetch(
			request,
			Box::new(move |outcome| match weak.upgrade() {
				Some(engine) => engine.receive(Completion {
					target,
					locator,
					outcome,
				}),
				None => tracing::debug!(target_region = %target, "engine dropped, discarding content"),
			}),
		);
	}

	/// Writes the canonical address for the committed state.
	fn write_address(
		&mut self,
		applied: &ApplyReport,
		origin: Origin,
		live: &str,
		entry: Option<HistoryEntry>,
	) -> EngineResult<Option<String>> {
		if applied.is_aborted() {
			self.bridge.mark_seen(live);
			return Ok(None);
		}
		let encoded = self.codec.encode(self.store.state());
		let address = self.codec.compose(live, &encoded);

		match origin {
			Origin::Programmatic => {
				if address == live {
					self.bridge.mark_seen(live);
					return Ok(None);
				}
				self.bridge.push(&encoded, &address)?;
			}
			Origin::Initial | Origin::Secondary => {
				if let Some(entry) = &entry {
					self.bridge.adopt(entry);
				}
				self.bridge.replace(&encoded, &address)?;
			}
			Origin::Notification | Origin::Poll => match entry {
				// back/forward: the entry already carries its level
				Some(entry) => {
					self.bridge.adopt(&entry);
					if address == live && entry.encoded_pairs == encoded {
						self.bridge.mark_seen(live);
						return Ok(None);
					}
					self.bridge.replace(&encoded, &address)?;
				}
				// a followed link created the entry
				None => {
					self.bridge.stamp(&encoded, &address)?;
				}
			},
		}
		Ok(Some(address))
	}

	fn complete(&mut self, completion: Completion) -> EngineResult<()> {
		let Completion {
			target,
			locator,
			outcome,
		} = completion;
		let content = match outcome {
			FetchOutcome::Success(content) => content,
			FetchOutcome::Error(status) => {
				tracing::warn!(target_region = %target, %locator, status, "fetch failed");
				self.config.render_error(status, &locator)
			}
			FetchOutcome::Timeout => {
				tracing::warn!(target_region = %target, %locator, "fetch timed out");
				self.config.render_timeout(&locator)
			}
		};
		let arrival = self
			.reconciler
			.add_content(&target, content, &mut self.dom, &mut self.observers);
		self.heal(&arrival.not_found)
	}

	/// Drops regions whose nodes never appeared and silently rewrites the
	/// address without them.
	fn heal(&mut self, missing: &[RegionId]) -> EngineResult<()> {
		if missing.is_empty() {
			return Ok(());
		}
		tracing::warn!(targets = ?missing, "regions not found in the document, dropping them");
		self.reconciler.forget_keys(missing);
		if !self.store.forget(missing) {
			return Ok(());
		}
		let live = self.bridge.current_address();
		let encoded = self.codec.encode(self.store.state());
		let address = self.codec.compose(&live, &encoded);
		self.bridge.replace(&encoded, &address)?;
		Ok(())
	}
}

/// Store callbacks for one cycle.
struct CycleHandler<'a, D: Dom> {
	dom: &'a mut D,
	reconciler: &'a mut ContentReconciler,
	observers: &'a mut Observers,
	config: &'a EngineConfig,
	requests: Vec<FetchRequest>,
}

impl<D: Dom> CycleHandler<'_, D> {
	fn bind(&mut self, pair: &Pair) -> ControlFlow<()> {
		// Content requested earlier in the batch may still create the node.
		if self.dom.find_region_node(&pair.target).is_none() && self.requests.is_empty() {
			tracing::warn!(target_region = %pair.target, "no node for region");
			return ControlFlow::Break(());
		}
		match &pair.resource {
			Resource::Default => {
				self.reconciler
					.remove_content(&pair.target, &mut *self.dom, &mut *self.observers);
			}
			Resource::Locator(locator) => self.requests.push(FetchRequest {
				target: pair.target.clone(),
				locator: locator.clone(),
				method: self.config.fetch.method.clone(),
				asynchronous: self.config.fetch.asynchronous,
				timeout: self.config.timeout(),
			}),
		}
		ControlFlow::Continue(())
	}
}

impl<D: Dom> PairHandler for CycleHandler<'_, D> {
	fn on_add(&mut self, pair: &Pair) -> ControlFlow<()> {
		self.bind(pair)
	}

	fn on_replace(&mut self, new: &Pair, _old: &Pair) -> ControlFlow<()> {
		self.bind(new)
	}

	fn on_delete(&mut self, pair: &Pair) {
		self.reconciler
			.remove_content(&pair.target, &mut *self.dom, &mut *self.observers);
	}
}
