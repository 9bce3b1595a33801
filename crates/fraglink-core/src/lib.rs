//! Fraglink Core - URL-State Synchronization Engine
//!
//! Keeps a page's addressable regions in sync with the browser address so
//! that partial page updates stay bookmarkable, shareable and navigable with
//! the back and forward buttons.
//!
//! The address carries an ordered list of `region=resource` pairs. On every
//! address change the engine diffs the new list against the applied one,
//! fetches the content of the regions that changed, injects it in declared
//! order and restores the original markup of regions that were unbound.
//!
//! ## Architecture
//!
//! - [`pair`]: regions, resources and the ordered pair list
//! - [`codec`]: the hash-bang and at-inclusion address grammars
//! - [`store`]: declarative and incremental diffing with cascade deletes
//! - [`reconciler`]: out-of-order content buffering and default snapshots
//! - [`history`]: levels, silent updates, polling and the secondary slot
//! - [`engine`]: the composition root running one cycle per change
//! - [`observer`]: extension hooks around diffing and injection
//! - [`dom`], [`fetch`]: contracts implemented by the environment
//! - [`config`]: TOML-loadable engine settings
//!
//! ## Example
//!
//! ```ignore
//! use fraglink_core::{Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::default(), dom, fetcher, history)?;
//! engine.start()?;
//! engine.set_region("main", "page2.html")?;
//! engine.remove_region("side")?;
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod history;
pub mod observer;
pub mod pair;
pub mod reconciler;
pub mod store;

pub use codec::{AtInclusionCodec, Grammar, HashBangCodec, Operation, UrlCodec};
pub use config::{EngineConfig, FetchConfig, PollingConfig};
pub use dom::{Dom, DomTree};
pub use engine::{CycleReport, Engine, Origin, WeakEngine};
pub use error::{ConfigError, EngineError, EngineResult, HistoryError};
pub use fetch::{FetchCallback, FetchOutcome, FetchRequest, Fetcher};
pub use history::{
	ChangeHandler, History, HistoryBridge, HistoryEntry, PollSettings, SecondarySlot,
};
pub use observer::{EngineObserver, Observers};
pub use pair::{DEFAULT_SENTINEL, Pair, PairState, RegionId, Resource};
pub use reconciler::{Arrival, ContentReconciler};
pub use store::{ApplyReport, Nesting, PairHandler, PairStore, RegionTree};
