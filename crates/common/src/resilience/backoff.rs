//! Exponential backoff with symmetric jitter.
//!
//! The delay for the `n`-th consecutive failure is
//! `min(initial * multiplier^(n - 1), max)`, perturbed by up to ±20% and
//! floored at [`MIN_DELAY_SECONDS`]. Zero failures means no delay at all.
//!
//! Randomness is drawn through [`JitterSource`] so tests can pin it with
//! [`FixedJitter`].

use std::time::Duration;

use rand::Rng;
use thiserror::Error;

/// Fraction of the capped delay that jitter may add or remove.
pub const JITTER_RATIO: f64 = 0.2;

/// Smallest delay ever returned for a non-zero failure count.
pub const MIN_DELAY_SECONDS: f64 = 0.1;

/// Errors raised when constructing a [`BackoffPolicy`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackoffError {
    #[error("initial delay must be finite and non-negative, got {0}")]
    InvalidInitialDelay(f64),

    #[error("max delay {max} must be finite and at least the initial delay {initial}")]
    InvalidMaxDelay { initial: f64, max: f64 },

    #[error("backoff multiplier must be finite and >= 1.0, got {0}")]
    InvalidMultiplier(f64),
}

/// Supplies jitter draws in `[-1.0, 1.0]`.
pub trait JitterSource: Send + Sync {
    fn sample(&self) -> f64;
}

/// Uniform draws from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn sample(&self) -> f64 {
        rand::thread_rng().gen_range(-1.0..=1.0)
    }
}

/// Always returns the same draw. Out-of-range values are clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn sample(&self) -> f64 {
        self.0.clamp(-1.0, 1.0)
    }
}

/// Computes the reconnect delay in seconds.
///
/// Never fails: non-finite intermediate values collapse to the floor.
///
/// # Examples
///
/// ```
/// use linkguard_common::resilience::{backoff_delay_seconds, FixedJitter};
///
/// let no_jitter = FixedJitter(0.0);
/// assert_eq!(backoff_delay_seconds(0, 2.0, 300.0, 2.0, &no_jitter), 0.0);
/// assert_eq!(backoff_delay_seconds(3, 2.0, 300.0, 2.0, &no_jitter), 8.0);
/// assert_eq!(backoff_delay_seconds(20, 2.0, 300.0, 2.0, &no_jitter), 300.0);
/// ```
#[must_use]
pub fn backoff_delay_seconds(
    consecutive_failures: u32,
    initial: f64,
    max: f64,
    multiplier: f64,
    jitter: &dyn JitterSource,
) -> f64 {
    if consecutive_failures == 0 {
        return 0.0;
    }

    let exponent = i32::try_from(consecutive_failures - 1).unwrap_or(i32::MAX);
    let base = initial * multiplier.powi(exponent);
    let capped = base.min(max);
    let draw = jitter.sample().clamp(-1.0, 1.0);
    let jittered = capped + capped * JITTER_RATIO * draw;

    // f64::max discards NaN, so a degenerate input still yields the floor.
    jittered.max(MIN_DELAY_SECONDS)
}

/// Validated reconnect delay parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    initial_seconds: f64,
    max_seconds: f64,
    multiplier: f64,
}

impl BackoffPolicy {
    /// Builds a policy, rejecting parameters that would make delays shrink
    /// or become undefined.
    ///
    /// # Errors
    /// Returns [`BackoffError`] when the initial delay is negative, the cap is
    /// below the initial delay, or the multiplier is below `1.0`.
    pub fn new(
        initial_seconds: f64,
        max_seconds: f64,
        multiplier: f64,
    ) -> Result<Self, BackoffError> {
        if !initial_seconds.is_finite() || initial_seconds < 0.0 {
            return Err(BackoffError::InvalidInitialDelay(initial_seconds));
        }
        if !max_seconds.is_finite() || max_seconds < initial_seconds {
            return Err(BackoffError::InvalidMaxDelay {
                initial: initial_seconds,
                max: max_seconds,
            });
        }
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(BackoffError::InvalidMultiplier(multiplier));
        }
        Ok(Self { initial_seconds, max_seconds, multiplier })
    }

    #[must_use]
    pub fn initial_seconds(&self) -> f64 {
        self.initial_seconds
    }

    #[must_use]
    pub fn max_seconds(&self) -> f64 {
        self.max_seconds
    }

    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Delay in seconds for the given failure streak.
    #[must_use]
    pub fn delay_seconds(&self, consecutive_failures: u32, jitter: &dyn JitterSource) -> f64 {
        backoff_delay_seconds(
            consecutive_failures,
            self.initial_seconds,
            self.max_seconds,
            self.multiplier,
            jitter,
        )
    }

    /// Delay as a [`Duration`] for the given failure streak.
    #[must_use]
    pub fn delay(&self, consecutive_failures: u32, jitter: &dyn JitterSource) -> Duration {
        Duration::try_from_secs_f64(self.delay_seconds(consecutive_failures, jitter))
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for BackoffPolicy {
    /// 2s initial, 300s cap, doubling.
    fn default() -> Self {
        Self { initial_seconds: 2.0, max_seconds: 300.0, multiplier: 2.0 }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for resilience::backoff.
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Validates the un-jittered exponential curve.
    ///
    /// Assertions:
    /// - Zero failures yields zero delay.
    /// - Delays double from the initial value.
    /// - The cap is respected once reached.
    #[test]
    fn exponential_curve_without_jitter() {
        let jitter = FixedJitter(0.0);
        let delays: Vec<f64> =
            (0..=10).map(|n| backoff_delay_seconds(n, 2.0, 300.0, 2.0, &jitter)).collect();

        assert!(approx(delays[0], 0.0));
        assert!(approx(delays[1], 2.0));
        assert!(approx(delays[2], 4.0));
        assert!(approx(delays[3], 8.0));
        assert!(approx(delays[8], 256.0));
        assert!(approx(delays[9], 300.0));
        assert!(approx(delays[10], 300.0));
    }

    /// Validates jitter extremes move the delay by exactly 20%.
    #[test]
    fn jitter_bounds_are_twenty_percent() {
        let low = backoff_delay_seconds(1, 10.0, 300.0, 2.0, &FixedJitter(-1.0));
        let high = backoff_delay_seconds(1, 10.0, 300.0, 2.0, &FixedJitter(1.0));
        assert!(approx(low, 8.0));
        assert!(approx(high, 12.0));

        let clamped = backoff_delay_seconds(1, 10.0, 300.0, 2.0, &FixedJitter(7.0));
        assert!(approx(clamped, 12.0));
    }

    /// Validates the floor applies to tiny delays.
    #[test]
    fn delay_is_floored() {
        let delay = backoff_delay_seconds(1, 0.01, 1.0, 2.0, &FixedJitter(-1.0));
        assert!(approx(delay, MIN_DELAY_SECONDS));

        let zero_cap = backoff_delay_seconds(4, 0.0, 0.0, 2.0, &FixedJitter(0.0));
        assert!(approx(zero_cap, MIN_DELAY_SECONDS));
    }

    /// Validates monotonicity for every fixed jitter draw in range.
    #[test]
    fn monotonic_for_fixed_draws() {
        for step in -10..=10 {
            let jitter = FixedJitter(f64::from(step) / 10.0);
            let mut previous = 0.0;
            for failures in 0..40 {
                let delay = backoff_delay_seconds(failures, 1.5, 120.0, 1.7, &jitter);
                assert!(delay >= previous, "draw {step} failures {failures}");
                if failures > 0 {
                    assert!(delay >= MIN_DELAY_SECONDS);
                }
                previous = delay;
            }
        }
    }

    /// Validates random draws stay inside the ±20% envelope.
    #[test]
    fn random_jitter_stays_in_envelope() {
        let jitter = RandomJitter;
        for _ in 0..500 {
            let delay = backoff_delay_seconds(2, 5.0, 300.0, 2.0, &jitter);
            assert!((8.0..=12.0).contains(&delay), "delay {delay}");
        }
    }

    #[test]
    fn huge_failure_counts_saturate_at_cap() {
        let delay = backoff_delay_seconds(u32::MAX, 2.0, 300.0, 2.0, &FixedJitter(0.0));
        assert!(approx(delay, 300.0));
    }

    #[test]
    fn policy_validation_rejects_bad_parameters() {
        assert_eq!(
            BackoffPolicy::new(-1.0, 10.0, 2.0),
            Err(BackoffError::InvalidInitialDelay(-1.0))
        );
        assert!(matches!(
            BackoffPolicy::new(10.0, 5.0, 2.0),
            Err(BackoffError::InvalidMaxDelay { .. })
        ));
        assert_eq!(BackoffPolicy::new(1.0, 5.0, 0.5), Err(BackoffError::InvalidMultiplier(0.5)));
        assert!(BackoffPolicy::new(2.0, 300.0, 2.0).is_ok());
    }

    #[test]
    fn policy_delay_matches_free_function() {
        let policy = BackoffPolicy::default();
        let jitter = FixedJitter(0.5);
        assert_eq!(policy.delay(0, &jitter), Duration::ZERO);
        assert!(approx(policy.delay_seconds(3, &jitter), 8.8));
    }
}
