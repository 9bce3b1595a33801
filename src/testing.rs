//! Test doubles and fixtures.
//!
//! # Examples
//!
//! ```rust,no_run
//! # #[cfg(feature = "testkit")]
//! use fraglink::testing::fixtures::Harness;
//! ```

pub use fraglink_testkit::*;
