//! Fraglink DOM - browser bindings for the URL-state engine
//!
//! Implements the environment contracts of `fraglink-core` on top of
//! `web-sys`:
//!
//! - [`WebDom`]: regions are elements looked up by id
//! - [`WebHistory`]: `pushState`/`replaceState` with `popstate` and `hashchange`
//! - [`WebFetcher`]: HTTP requests through `reqwest` with a timer-based timeout
//! - [`IframeSlot`]: a hidden iframe mirroring every address write
//!
//! [`launch`] wires them together for the current page. The browser types
//! only exist on `wasm32`; the error type and the slot address helpers are
//! available everywhere.

pub mod error;
pub mod slot;

// Browser-independent halves of the bindings, unit tested natively.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
mod listeners;
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
mod settle;

#[cfg(target_arch = "wasm32")]
pub mod document;
#[cfg(target_arch = "wasm32")]
pub mod history;
#[cfg(target_arch = "wasm32")]
pub mod launch;
#[cfg(target_arch = "wasm32")]
pub mod transport;

pub use error::{LaunchError, LaunchResult};
pub use slot::{address_from_slot_hash, slot_hash};

#[cfg(target_arch = "wasm32")]
pub use document::WebDom;
#[cfg(target_arch = "wasm32")]
pub use history::WebHistory;
#[cfg(target_arch = "wasm32")]
pub use launch::{BrowserEngine, launch};
#[cfg(target_arch = "wasm32")]
pub use slot::IframeSlot;
#[cfg(target_arch = "wasm32")]
pub use transport::WebFetcher;
