//! Time sources.
//!
//! Connection bookkeeping stores wall-clock timestamps as fractional Unix
//! seconds and measures elapsed time against them. Everything that reads the
//! time takes a [`Clock`] so tests can pin and advance it.

mod clock;

pub use clock::{Clock, MockClock, SystemClock};
