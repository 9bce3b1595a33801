//! Error types for the synchronization engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failure reported by a history collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("history update failed: {0}")]
pub struct HistoryError(pub String);

impl HistoryError {
	/// Creates a history error from any message.
	pub fn new(message: impl Into<String>) -> Self {
		Self(message.into())
	}
}

/// Configuration errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
	/// TOML parsing error.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// A field holds a value the engine cannot run with.
	#[error("invalid value for '{field}': {reason}")]
	InvalidValue {
		/// Offending field.
		field: &'static str,
		/// Why it was rejected.
		reason: String,
	},
}

/// Engine errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
	/// The history collaborator refused an update.
	#[error(transparent)]
	History(#[from] HistoryError),

	/// The engine was dropped while a callback still referenced it.
	#[error("engine is no longer alive")]
	Detached,

	/// The engine is already processing a change.
	#[error("engine is busy processing another change")]
	Busy,

	/// Invalid configuration.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
