//! Secondary history slot backed by a hidden iframe.
//!
//! Every address the engine writes is mirrored as the iframe's hash, which
//! adds an entry to the joint session history. When the user traverses back
//! to one of those entries only the iframe's hash changes; its `hashchange`
//! listener hands the mirrored address back to the engine.

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

const SLOT_ESCAPES: &AsciiSet = &CONTROLS.add(b' ').add(b'#').add(b'%');

/// Encodes an address as the slot's hash.
pub fn slot_hash(address: &str) -> String {
	format!("#{}", utf8_percent_encode(address, SLOT_ESCAPES))
}

/// Decodes the address mirrored in a slot hash.
pub fn address_from_slot_hash(hash: &str) -> Option<String> {
	let body = hash.strip_prefix('#').unwrap_or(hash);
	if body.is_empty() {
		return None;
	}
	Some(percent_decode_str(body).decode_utf8_lossy().into_owned())
}

#[cfg(target_arch = "wasm32")]
pub use browser::IframeSlot;

#[cfg(target_arch = "wasm32")]
mod browser {
	use super::{address_from_slot_hash, slot_hash};
	use crate::error::{LaunchError, LaunchResult, describe};
	use fraglink_core::{Dom, Fetcher, History, SecondarySlot, WeakEngine};
	use wasm_bindgen::JsCast;
	use wasm_bindgen::prelude::*;
	use web_sys::{Document, Event, HtmlIFrameElement, Window};

	/// [`SecondarySlot`] mirroring addresses into a hidden iframe.
	pub struct IframeSlot {
		frame: HtmlIFrameElement,
		window: Window,
		listener: Closure<dyn FnMut(Event)>,
	}

	impl std::fmt::Debug for IframeSlot {
		fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
			f.debug_struct("IframeSlot").finish_non_exhaustive()
		}
	}

	impl IframeSlot {
		/// Appends the hidden iframe to `document` and routes its traversals
		/// to `engine`.
		pub fn install<D, F, H>(document: &Document, engine: WeakEngine<D, F, H>) -> LaunchResult<Self>
		where
			D: Dom + 'static,
			F: Fetcher + 'static,
			H: History + 'static,
		{
			let frame: HtmlIFrameElement = document
				.create_element("iframe")?
				.dyn_into()
				.map_err(|_| LaunchError::Js("created element is not an iframe".to_string()))?;
			frame.set_attribute("aria-hidden", "true")?;
			frame.set_attribute("tabindex", "-1")?;
			frame.set_attribute("style", "display:none")?;
			frame.set_src("about:blank");
			document
				.body()
				.ok_or(LaunchError::NoDocument)?
				.append_child(&frame)?;

			let window = frame
				.content_window()
				.ok_or_else(|| LaunchError::Js("iframe has no window".to_string()))?;
			let observed = window.clone();
			let listener = Closure::wrap(Box::new(move |_event: Event| {
				let Some(engine) = engine.upgrade() else {
					return;
				};
				let hash = observed.location().hash().unwrap_or_default();
				let Some(address) = address_from_slot_hash(&hash) else {
					return;
				};
				if let Err(error) = engine.handle_secondary_traversal(&address) {
					tracing::error!(%error, "failed to follow secondary history");
				}
			}) as Box<dyn FnMut(Event)>);
			window.add_event_listener_with_callback("hashchange", listener.as_ref().unchecked_ref())?;

			Ok(Self {
				frame,
				window,
				listener,
			})
		}
	}

	impl SecondarySlot for IframeSlot {
		fn mirror(&mut self, address: &str) {
			if let Err(error) = self.window.location().set_hash(&slot_hash(address)) {
				tracing::warn!(error = %describe(&error), "cannot mirror address");
			}
		}
	}

	impl Drop for IframeSlot {
		fn drop(&mut self) {
			let _ = self
				.window
				.remove_event_listener_with_callback("hashchange", self.listener.as_ref().unchecked_ref());
			self.frame.remove();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("/index.html#!main=a.html", "#/index.html%23!main=a.html")]
	#[case("/docs/@!main=a%2Cb.html?x=1", "#/docs/@!main=a%252Cb.html?x=1")]
	fn test_slot_hash(#[case] address: &str, #[case] hash: &str) {
		assert_eq!(slot_hash(address), hash);
		assert_eq!(address_from_slot_hash(hash).as_deref(), Some(address));
	}

	#[rstest]
	#[case("")]
	#[case("#")]
	fn test_empty_slot_hash(#[case] hash: &str) {
		assert_eq!(address_from_slot_hash(hash), None);
	}
}
