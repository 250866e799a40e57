//! Shared utilities for the LinkGuard crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: clocks, bounded collections, backoff policy

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod collections;
#[cfg(feature = "foundation")]
pub mod resilience;
#[cfg(feature = "foundation")]
pub mod time;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use collections::RingBuffer;
#[cfg(feature = "foundation")]
pub use resilience::{BackoffError, BackoffPolicy, FixedJitter, JitterSource, RandomJitter};
#[cfg(feature = "foundation")]
pub use time::{Clock, MockClock, SystemClock};
