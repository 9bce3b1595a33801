//! # Fraglink
//!
//! Bookmarkable partial page updates for Rust and WebAssembly.
//!
//! A page declares addressable regions by element id. Loading a fragment
//! into a region is recorded in the browser address as a `region=resource`
//! pair, so the composed page can be bookmarked, shared and walked with the
//! back and forward buttons:
//!
//! ```text
//! /index.html#!main=news.html,!side=links.html
//! /docs/@!main=news.html,!side=links.html?lang=en
//! ```
//!
//! ## Feature Flags
//!
//! - `web` - browser bindings over `web-sys` (wasm32 only)
//! - `testkit` - in-memory document, transport and history doubles
//! - `full` - all of the above
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use fraglink::{Engine, EngineConfig};
//!
//! let config = EngineConfig::from_toml_str(r#"grammar = "at_inclusion""#)?;
//! let engine = Engine::new(config, dom, fetcher, history)?;
//! engine.start()?;
//! engine.set_region("main", "news.html")?;
//! ```

pub use fraglink_core::*;

#[cfg(feature = "testkit")]
pub mod testing;
#[cfg(feature = "web")]
pub mod web;
