//! Session history through the History API.

use crate::error::describe;
use crate::listeners::register_all;
use fraglink_core::{ChangeHandler, History, HistoryEntry, HistoryError};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Event, Window};

/// [`History`] over `window.history`.
///
/// Entry state is stored as a plain JSON object so it survives reloads.
/// Both `popstate` and `hashchange` are forwarded to the engine; a duplicate
/// notification for the same address is absorbed by its last-seen check.
pub struct WebHistory {
	window: Window,
	listeners: Vec<(&'static str, Closure<dyn FnMut(Event)>)>,
}

const CHANGE_EVENTS: [&str; 2] = ["popstate", "hashchange"];

impl std::fmt::Debug for WebHistory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WebHistory")
			.field("listeners", &self.listeners.len())
			.finish()
	}
}

impl WebHistory {
	/// Wraps `window`.
	pub fn new(window: Window) -> Self {
		Self {
			window,
			listeners: Vec::new(),
		}
	}

	fn write(&self, entry: &HistoryEntry, address: &str, push: bool) -> Result<(), HistoryError> {
		let history = self
			.window
			.history()
			.map_err(|e| HistoryError::new(describe(&e)))?;
		let json = serde_json::to_string(entry).map_err(|e| HistoryError::new(e.to_string()))?;
		let state = js_sys::JSON::parse(&json).map_err(|e| HistoryError::new(describe(&e)))?;
		let result = if push {
			history.push_state_with_url(&state, "", Some(address))
		} else {
			history.replace_state_with_url(&state, "", Some(address))
		};
		result.map_err(|e| HistoryError::new(describe(&e)))
	}
}

impl Drop for WebHistory {
	fn drop(&mut self) {
		for (event, listener) in &self.listeners {
			let _ = self
				.window
				.remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref());
		}
	}
}

impl History for WebHistory {
	fn push_entry(&mut self, entry: &HistoryEntry, address: &str) -> Result<(), HistoryError> {
		self.write(entry, address, true)
	}

	fn replace_entry(&mut self, entry: &HistoryEntry, address: &str) -> Result<(), HistoryError> {
		self.write(entry, address, false)
	}

	fn subscribe(&mut self, handler: ChangeHandler) -> bool {
		let handler = Rc::new(RefCell::new(handler));
		let window = &self.window;
		let registered = register_all(
			&CHANGE_EVENTS,
			|event| {
				let handler = Rc::clone(&handler);
				let listener = Closure::wrap(Box::new(move |_event: Event| {
					// a nested dispatch would only repeat the same address
					if let Ok(mut handler) = handler.try_borrow_mut() {
						(&mut *handler)();
					}
				}) as Box<dyn FnMut(Event)>);
				window
					.add_event_listener_with_callback(event, listener.as_ref().unchecked_ref())
					.map(|()| listener)
					.map_err(|error| (event, error))
			},
			|event, listener| {
				let _ = window.remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref());
			},
		);
		match registered {
			Ok(listeners) => {
				self.listeners.extend(listeners);
				true
			}
			Err((event, error)) => {
				tracing::warn!(event, error = %describe(&error), "cannot listen for address changes");
				false
			}
		}
	}

	fn current_address(&self) -> String {
		let location = self.window.location();
		let path = location.pathname().unwrap_or_default();
		let search = location.search().unwrap_or_default();
		let hash = location.hash().unwrap_or_default();
		format!("{}{}{}", path, search, hash)
	}

	fn current_entry(&self) -> Option<HistoryEntry> {
		let state = self.window.history().ok()?.state().ok()?;
		if state.is_null() || state.is_undefined() {
			return None;
		}
		let json = js_sys::JSON::stringify(&state).ok()?.as_string()?;
		serde_json::from_str(&json).ok()
	}
}
