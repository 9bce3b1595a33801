//! Browser bindings.
//!
//! This module provides access to fraglink-dom, which implements the
//! document, transport and history contracts with `web-sys`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use fraglink::EngineConfig;
//! use fraglink::web::launch;
//!
//! let engine = launch(EngineConfig::default().with_secondary_slot(true))?;
//! engine.set_region("main", "/fragments/about.html")?;
//! ```

pub use fraglink_dom::*;
