//! Inbound commands - the calls services make into the monitor

mod connection;
mod health;
mod suppression;

pub use connection::*;
pub use health::*;
pub use suppression::*;
