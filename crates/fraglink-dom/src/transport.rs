//! Content transport over `reqwest`'s fetch backend.

use crate::error::describe;
use crate::settle::Settle;
use fraglink_core::{FetchCallback, FetchOutcome, FetchRequest, Fetcher};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Window;

/// Network failure without an HTTP status.
const NETWORK_ERROR: u16 = 0;

/// [`Fetcher`] issuing one HTTP request per region.
///
/// Locators are resolved against the document address. A timer races every
/// request; whichever finishes first reports the outcome.
#[derive(Debug, Clone)]
pub struct WebFetcher {
	window: Window,
	client: reqwest::Client,
}

impl WebFetcher {
	/// Creates a fetcher for pages shown in `window`.
	pub fn new(window: Window) -> Self {
		Self {
			window,
			client: reqwest::Client::new(),
		}
	}

	fn resolve(&self, locator: &str) -> Option<String> {
		let base = self.window.location().href().ok()?;
		web_sys::Url::new_with_base(locator, &base)
			.ok()
			.map(|url| url.href())
	}
}

impl Fetcher for WebFetcher {
	fn fetch(&mut self, request: FetchRequest, done: FetchCallback) {
		let settle = Settle::new(done);
		if !request.asynchronous {
			tracing::debug!("blocking requests are unavailable in the browser, fetching asynchronously");
		}
		let Some(url) = self.resolve(&request.locator) else {
			tracing::warn!(locator = %request.locator, "cannot resolve locator");
			settle.finish(FetchOutcome::Error(NETWORK_ERROR));
			return;
		};
		let method = reqwest::Method::from_bytes(request.method.as_bytes()).unwrap_or_else(|_| {
			tracing::warn!(method = %request.method, "unknown request method, using GET");
			reqwest::Method::GET
		});

		let timer = {
			let settle = settle.clone();
			Closure::once_into_js(move || settle.finish(FetchOutcome::Timeout))
		};
		let timeout_ms = i32::try_from(request.timeout.as_millis()).unwrap_or(i32::MAX);
		match self
			.window
			.set_timeout_with_callback_and_timeout_and_arguments_0(timer.unchecked_ref(), timeout_ms)
		{
			Ok(handle) => {
				let window = self.window.clone();
				settle.arm(move || window.clear_timeout_with_handle(handle));
			}
			Err(error) => {
				tracing::warn!(error = %describe(&error), "cannot arm fetch timeout");
			}
		}

		let pending = self.client.request(method, url).send();
		wasm_bindgen_futures::spawn_local(async move {
			let outcome = match pending.await {
				Ok(response) if response.status().is_success() => match response.text().await {
					Ok(body) => FetchOutcome::Success(body),
					Err(error) => {
						tracing::warn!(%error, "cannot read response body");
						FetchOutcome::Error(NETWORK_ERROR)
					}
				},
				Ok(response) => FetchOutcome::Error(response.status().as_u16()),
				Err(error) => {
					tracing::warn!(%error, "request failed");
					FetchOutcome::Error(error.status().map_or(NETWORK_ERROR, |s| s.as_u16()))
				}
			};
			settle.finish(outcome);
		});
	}
}
