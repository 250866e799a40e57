//! Bounded collections.
//!
//! - **[`ring_buffer`]**: fixed-capacity history that evicts its oldest entry

pub mod ring_buffer;

pub use ring_buffer::RingBuffer;
