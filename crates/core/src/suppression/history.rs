//! Bounded suppression decision history and statistics.

use linkguard_common::RingBuffer;
use linkguard_domain::constants::DECISION_HISTORY_CAPACITY;
use linkguard_domain::{SuppressionDecision, SuppressionStatistics};
use parking_lot::Mutex;

/// Retains the most recent decisions, oldest evicted first.
///
/// Statistics are computed by scanning what is retained, so they describe
/// the window rather than process lifetime.
#[derive(Debug)]
pub struct SuppressionTracker {
    history: Mutex<RingBuffer<SuppressionDecision>>,
}

impl SuppressionTracker {
    #[must_use]
    pub fn new(max_history_entries: usize) -> Self {
        Self { history: Mutex::new(RingBuffer::new(max_history_entries)) }
    }

    pub fn record_decision(&self, decision: SuppressionDecision) {
        self.history.lock().push(decision);
    }

    /// Up to `limit` most recent decisions, oldest first.
    #[must_use]
    pub fn get_recent_decisions(&self, limit: usize) -> Vec<SuppressionDecision> {
        self.history.lock().latest(limit).cloned().collect()
    }

    #[must_use]
    pub fn get_all_decisions(&self) -> Vec<SuppressionDecision> {
        self.history.lock().iter().cloned().collect()
    }

    #[must_use]
    pub fn has_history(&self) -> bool {
        !self.history.lock().is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_history()
    }

    #[must_use]
    pub fn max_history_entries(&self) -> usize {
        self.history.lock().capacity()
    }

    #[must_use]
    pub fn statistics(&self) -> SuppressionStatistics {
        let history = self.history.lock();
        let mut stats = SuppressionStatistics::default();
        for decision in history.iter() {
            stats.total_decisions += 1;
            if decision.should_suppress {
                stats.suppressed_count += 1;
            }
            stats
                .by_service
                .entry(decision.service_name.clone())
                .or_default()
                .record(decision.should_suppress);
            stats.by_alert_type.entry(decision.alert_type).or_default().record(decision.should_suppress);
        }
        if stats.total_decisions > 0 {
            #[allow(clippy::cast_precision_loss)]
            let rate = stats.suppressed_count as f64 / stats.total_decisions as f64;
            stats.suppression_rate = rate;
        }
        stats
    }
}

impl Default for SuppressionTracker {
    fn default() -> Self {
        Self::new(DECISION_HISTORY_CAPACITY)
    }
}
