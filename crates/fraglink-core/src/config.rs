//! Engine configuration.
//!
//! All fields have defaults, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! grammar = "hash_bang"
//! secondary_slot = false
//! error_template = "<div class=\"fraglink-error\">Error {status} loading {locator}</div>"
//!
//! [fetch]
//! method = "GET"
//! asynchronous = true
//! timeout_ms = 30000
//!
//! [polling]
//! enabled = true
//! interval_ms = 100
//! max_failures = 10
//! ```

use crate::codec::Grammar;
use crate::error::ConfigError;
use crate::history::PollSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_ERROR_TEMPLATE: &str =
	"<div class=\"fraglink-error\">Error {status} loading {locator}</div>";
const DEFAULT_TIMEOUT_TEMPLATE: &str =
	"<div class=\"fraglink-timeout\">Timed out loading {locator}</div>";

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
	/// Request method.
	pub method: String,
	/// Whether requests may complete asynchronously.
	pub asynchronous: bool,
	/// Timeout in milliseconds.
	pub timeout_ms: u64,
}

impl Default for FetchConfig {
	fn default() -> Self {
		Self {
			method: "GET".to_string(),
			asynchronous: true,
			timeout_ms: 30_000,
		}
	}
}

/// Polling fallback settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
	/// Poll when the environment cannot notify address changes.
	pub enabled: bool,
	/// Delay between polls in milliseconds.
	pub interval_ms: u64,
	/// Failures tolerated per polling run.
	pub max_failures: u32,
}

impl Default for PollingConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			interval_ms: 100,
			max_failures: 10,
		}
	}
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	/// Address grammar.
	pub grammar: Grammar,
	/// Transport settings.
	pub fetch: FetchConfig,
	/// Polling fallback settings.
	pub polling: PollingConfig,
	/// Mirror address writes into a secondary history slot.
	pub secondary_slot: bool,
	/// Markup injected when a fetch fails; `{status}` and `{locator}` are substituted.
	pub error_template: String,
	/// Markup injected when a fetch times out; `{locator}` is substituted.
	pub timeout_template: String,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			grammar: Grammar::default(),
			fetch: FetchConfig::default(),
			polling: PollingConfig::default(),
			secondary_slot: false,
			error_template: DEFAULT_ERROR_TEMPLATE.to_string(),
			timeout_template: DEFAULT_TIMEOUT_TEMPLATE.to_string(),
		}
	}
}

impl EngineConfig {
	/// Creates the default configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses and validates a TOML document.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(source)?;
		config.validate()?;
		Ok(config)
	}

	/// Sets the grammar.
	pub fn with_grammar(mut self, grammar: Grammar) -> Self {
		self.grammar = grammar;
		self
	}

	/// Sets the request method.
	pub fn with_method(mut self, method: impl Into<String>) -> Self {
		self.fetch.method = method.into();
		self
	}

	/// Sets the request timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.fetch.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
		self
	}

	/// Sets the polling interval.
	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.polling.interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
		self
	}

	/// Sets the polling failure ceiling.
	pub fn with_max_poll_failures(mut self, max_failures: u32) -> Self {
		self.polling.max_failures = max_failures;
		self
	}

	/// Enables or disables the polling fallback.
	pub fn with_polling(mut self, enabled: bool) -> Self {
		self.polling.enabled = enabled;
		self
	}

	/// Enables or disables the secondary history slot.
	pub fn with_secondary_slot(mut self, enabled: bool) -> Self {
		self.secondary_slot = enabled;
		self
	}

	/// Sets the fetch error template.
	pub fn with_error_template(mut self, template: impl Into<String>) -> Self {
		self.error_template = template.into();
		self
	}

	/// Sets the fetch timeout template.
	pub fn with_timeout_template(mut self, template: impl Into<String>) -> Self {
		self.timeout_template = template.into();
		self
	}

	/// Rejects values the engine cannot run with.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.fetch.method.trim().is_empty() {
			return Err(ConfigError::InvalidValue {
				field: "fetch.method",
				reason: "must not be empty".to_string(),
			});
		}
		if self.polling.interval_ms == 0 {
			return Err(ConfigError::InvalidValue {
				field: "polling.interval_ms",
				reason: "must be greater than zero".to_string(),
			});
		}
		if self.polling.max_failures == 0 {
			return Err(ConfigError::InvalidValue {
				field: "polling.max_failures",
				reason: "must be greater than zero".to_string(),
			});
		}
		Ok(())
	}

	/// Request timeout.
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.fetch.timeout_ms)
	}

	/// Poll settings for the history bridge.
	pub fn poll_settings(&self) -> PollSettings {
		PollSettings {
			interval: Duration::from_millis(self.polling.interval_ms),
			max_failures: self.polling.max_failures,
		}
	}

	/// Renders the markup shown for a failed fetch.
	pub fn render_error(&self, status: u16, locator: &str) -> String {
		self.error_template
			.replace("{status}", &status.to_string())
			.replace("{locator}", locator)
	}

	/// Renders the markup shown for a timed-out fetch.
	pub fn render_timeout(&self, locator: &str) -> String {
		self.timeout_template.replace("{locator}", locator)
	}
}
