//! Alert suppression
//!
//! Decides whether a monitoring alert should be sent given the service's
//! connection state and the error that triggered it. Every decision is kept
//! in a bounded history for statistics.

mod context;
mod coordinator;
mod engine;
mod error;
mod evaluator;
mod history;

pub use context::ContextBuilder;
pub use coordinator::DecisionCoordinator;
pub use engine::{AlertSuppressionManager, SuppressionEngine};
pub use error::{SuppressionError, SuppressionResult};
pub use evaluator::{AlertEvaluator, Evaluation};
pub use history::SuppressionTracker;
