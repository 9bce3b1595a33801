//! Transport contract.

use crate::pair::RegionId;
use std::time::Duration;

/// A request for one region's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
	/// Region the content is destined for.
	pub target: RegionId,
	/// Resource locator taken from the pair.
	pub locator: String,
	/// Request method, `GET` unless configured otherwise.
	pub method: String,
	/// Whether the transport may complete later.
	pub asynchronous: bool,
	/// Time after which the transport reports [`FetchOutcome::Timeout`].
	pub timeout: Duration,
}

/// How a fetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
	/// Content retrieved.
	Success(String),
	/// Transport answered with an error status.
	Error(u16),
	/// No answer in time.
	Timeout,
}

/// Completion callback handed to the fetcher.
pub type FetchCallback = Box<dyn FnOnce(FetchOutcome)>;

/// Issues fetches and reports their outcome exactly once.
///
/// `done` may be called synchronously from inside `fetch` or at any later
/// point; completions for different requests may arrive in any order.
pub trait Fetcher {
	/// Starts a fetch.
	fn fetch(&mut self, request: FetchRequest, done: FetchCallback);
}
