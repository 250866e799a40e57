//! Resilience primitives.
//!
//! - **[`backoff`]**: exponential reconnect delay with symmetric jitter

pub mod backoff;

pub use backoff::{
    backoff_delay_seconds, BackoffError, BackoffPolicy, FixedJitter, JitterSource, RandomJitter,
    JITTER_RATIO, MIN_DELAY_SECONDS,
};
