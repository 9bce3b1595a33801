//! Browser binding errors.

use fraglink_core::{EngineError, HistoryError};
use thiserror::Error;

/// Result type for browser bindings.
pub type LaunchResult<T> = Result<T, LaunchError>;

/// Failures while wiring the engine into a page.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LaunchError {
	/// No `window` global (not running in a browser main thread).
	#[error("no window object")]
	NoWindow,

	/// The window has no document.
	#[error("no document object")]
	NoDocument,

	/// A browser API call threw.
	#[error("browser API error: {0}")]
	Js(String),

	/// The engine refused to start.
	#[error(transparent)]
	Engine(#[from] EngineError),
}

impl From<HistoryError> for LaunchError {
	fn from(error: HistoryError) -> Self {
		Self::Engine(EngineError::History(error))
	}
}

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for LaunchError {
	fn from(value: wasm_bindgen::JsValue) -> Self {
		Self::Js(describe(&value))
	}
}

/// Renders a thrown JavaScript value for logs and errors.
#[cfg(target_arch = "wasm32")]
pub(crate) fn describe(value: &wasm_bindgen::JsValue) -> String {
	value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
