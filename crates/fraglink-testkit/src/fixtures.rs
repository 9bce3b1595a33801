//! rstest fixtures.
//!
//! The fixture page has three regions:
//!
//! ```text
//! main            top level
//! └── side        nested in main
//! footer          top level
//! ```

use crate::{MockDom, MockFetcher, MockHistory};
use fraglink_core::{Engine, EngineConfig};
use rstest::fixture;

/// Default markup of `main`; it declares the nested `side` region.
pub const MAIN_DEFAULT: &str = r#"<h1>Welcome</h1><aside id="side"></aside>"#;
/// Default markup of `footer`.
pub const FOOTER_DEFAULT: &str = "<small>footer</small>";
/// Address of the fixture page.
pub const PAGE: &str = "/index.html";

/// Engine type built from the doubles.
pub type MockEngine = Engine<MockDom, MockFetcher, MockHistory>;

/// Handles on the doubles an engine was built from.
#[derive(Debug, Clone)]
pub struct Harness {
	/// The document.
	pub dom: MockDom,
	/// The transport.
	pub fetcher: MockFetcher,
	/// The session history.
	pub history: MockHistory,
}

impl Harness {
	/// Creates a harness around the fixture page at `address`, with
	/// synchronous fetches.
	pub fn at(address: &str) -> Self {
		Self {
			dom: page_dom(),
			fetcher: MockFetcher::immediate(),
			history: MockHistory::new(address),
		}
	}

	/// Swaps the transport.
	pub fn with_fetcher(mut self, fetcher: MockFetcher) -> Self {
		self.fetcher = fetcher;
		self
	}

	/// Swaps the history.
	pub fn with_history(mut self, history: MockHistory) -> Self {
		self.history = history;
		self
	}

	/// Builds an engine sharing this harness' doubles.
	pub fn engine(&self, config: EngineConfig) -> MockEngine {
		Engine::new(
			config,
			self.dom.clone(),
			self.fetcher.clone(),
			self.history.clone(),
		)
		.unwrap()
	}
}

/// Fixture page document.
#[fixture]
pub fn page_dom() -> MockDom {
	MockDom::new()
		.with_region("main", MAIN_DEFAULT)
		.with_region("footer", FOOTER_DEFAULT)
}

/// Harness on the fixture page without pairs.
#[fixture]
pub fn harness() -> Harness {
	Harness::at(PAGE)
}

/// Default configuration.
#[fixture]
pub fn config() -> EngineConfig {
	EngineConfig::default()
}
