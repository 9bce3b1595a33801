//! Fraglink Testkit - test doubles for the synchronization engine
//!
//! In-memory implementations of the environment contracts of
//! `fraglink-core`, all cheap to clone and sharing their state, so a test can
//! hand one clone to the engine and inspect another:
//!
//! - [`MockDom`]: regions discovered from `id="..."` attributes
//! - [`MockFetcher`]: synchronous or manually completed fetches
//! - [`MockHistory`]: a tab with back/forward and change notifications
//! - [`MockSlot`]: a secondary history slot recording mirrored addresses
//! - [`RecordingObserver`]: an observer logging every hook call
//!
//! ## Example
//!
//! ```
//! use fraglink_core::EngineConfig;
//! use fraglink_testkit::fixtures::Harness;
//!
//! let harness = Harness::at("/index.html#!main=page1.html");
//! let engine = harness.engine(EngineConfig::default());
//! engine.start().unwrap();
//!
//! assert_eq!(harness.dom.content("main").as_deref(), Some("<p>page1.html</p>"));
//! ```

pub mod dom;
pub mod fetch;
pub mod fixtures;
pub mod history;
pub mod observer;

pub use dom::MockDom;
pub use fetch::{FetchMode, MockFetcher};
pub use history::{HistoryWrite, MockHistory, MockSlot};
pub use observer::{ObserverEvent, RecordingObserver};
