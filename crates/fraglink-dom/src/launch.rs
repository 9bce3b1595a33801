//! Wiring the engine into the running page.

use crate::document::WebDom;
use crate::error::{LaunchError, LaunchResult, describe};
use crate::history::WebHistory;
use crate::slot::IframeSlot;
use crate::transport::WebFetcher;
use fraglink_core::{Engine, EngineConfig, WeakEngine};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Window;

/// Engine bound to the browser's document, network and session history.
pub type BrowserEngine = Engine<WebDom, WebFetcher, WebHistory>;

/// Builds and starts an engine for the current page.
///
/// The returned engine must be kept alive by the caller; event listeners
/// only hold weak handles and go quiet once it is dropped.
///
/// # Example
///
/// ```ignore
/// use fraglink_core::EngineConfig;
/// use fraglink_dom::launch;
///
/// let engine = launch(EngineConfig::default())?;
/// engine.set_region("main", "/fragments/news.html")?;
/// ```
pub fn launch(config: EngineConfig) -> LaunchResult<BrowserEngine> {
	let window = web_sys::window().ok_or(LaunchError::NoWindow)?;
	let document = window.document().ok_or(LaunchError::NoDocument)?;
	let secondary_slot = config.secondary_slot;

	let engine = Engine::new(
		config,
		WebDom::new(document.clone()),
		WebFetcher::new(window.clone()),
		WebHistory::new(window.clone()),
	)?;
	if secondary_slot {
		engine.attach_slot(IframeSlot::install(&document, engine.downgrade())?)?;
	}

	let report = engine.start()?;
	tracing::info!(
		pairs = engine.state().len(),
		level = report.level,
		requested = report.requested.len(),
		"fraglink started"
	);

	if engine.is_polling() {
		start_poller(&window, engine.downgrade(), engine.poll_interval())?;
	}
	Ok(engine)
}

/// Drives [`Engine::poll`] from a window interval until polling ends or the
/// engine is dropped.
fn start_poller(
	window: &Window,
	engine: WeakEngine<WebDom, WebFetcher, WebHistory>,
	interval: std::time::Duration,
) -> LaunchResult<()> {
	let handle = Rc::new(Cell::new(None::<i32>));
	let timer_window = window.clone();
	let timer_handle = Rc::clone(&handle);

	let tick = Closure::wrap(Box::new(move || {
		let running = match engine.upgrade() {
			Some(engine) => {
				if let Err(error) = engine.poll() {
					tracing::warn!(%error, "poll failed");
				}
				engine.is_polling()
			}
			None => false,
		};
		if !running && let Some(id) = timer_handle.take() {
			tracing::debug!("stopping address poller");
			timer_window.clear_interval_with_handle(id);
		}
	}) as Box<dyn FnMut()>);

	let millis = i32::try_from(interval.as_millis()).unwrap_or(i32::MAX);
	let id = window
		.set_interval_with_callback_and_timeout_and_arguments_0(tick.as_ref().unchecked_ref(), millis)
		.map_err(|e| LaunchError::Js(describe(&e)))?;
	handle.set(Some(id));
	// the interval owns the closure from here on
	tick.forget();
	Ok(())
}
