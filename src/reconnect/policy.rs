//! Reconnect delay policies.
//!
//! A policy maps the current [`ReconnectState`] to the wait before the next
//! attempt. Policies are pure: the same state always yields the same delay,
//! and wall-clock time never influences the result.
//!
//! # Policies
//!
//! | Policy | Delay for attempt `n` |
//! |--------|-----------------------|
//! | [`FixedDelay`] | constant (default 5000ms) |
//! | [`ExponentialBackoff`] | `min(base * 2^n, max)`, optionally jittered |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::state::ReconnectState;

// ============================================================================
// Constants
// ============================================================================

/// Default constant retry delay.
pub const DEFAULT_FIXED_DELAY: Duration = Duration::from_millis(5000);

/// Default first delay for exponential backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1000);

/// Default cap for exponential backoff.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_millis(30_000);

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Decides how long to wait before the next connection attempt.
pub trait ReconnectPolicy: fmt::Debug + Send + Sync + 'static {
    /// Returns the delay before the attempt following `state`.
    ///
    /// `state.attempt_count()` is the number of consecutive failures already
    /// recorded, so the first retry sees 0.
    fn next_delay(&self, state: &ReconnectState) -> Duration;
}

// ============================================================================
// FixedDelay
// ============================================================================

/// Waits the same time before every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Creates a fixed policy.
    #[inline]
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Returns the configured delay.
    #[inline]
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_FIXED_DELAY)
    }
}

impl ReconnectPolicy for FixedDelay {
    fn next_delay(&self, _state: &ReconnectState) -> Duration {
        self.delay
    }
}

// ============================================================================
// ExponentialBackoff
// ============================================================================

/// Doubles the delay per attempt up to a cap.
///
/// With `jitter_ratio > 0` each delay is scaled by a factor drawn from
/// `[1 - ratio, 1 + ratio]`, then clamped to `max`. The draw is seeded from
/// `seed ^ attempt_count`, so it is reproducible for a given policy while
/// clients constructed with different seeds spread their retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
    jitter_ratio: f64,
    seed: u64,
}

impl ExponentialBackoff {
    /// Creates an exact (jitter-free) backoff policy.
    #[inline]
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            jitter_ratio: 0.0,
            seed: 0,
        }
    }

    /// Enables jitter with a random per-instance seed.
    ///
    /// `ratio` is clamped to `[0.0, 1.0]`; `0.0` disables jitter.
    #[must_use]
    pub fn with_jitter(self, ratio: f64) -> Self {
        self.with_seeded_jitter(ratio, rand::random())
    }

    /// Enables jitter with an explicit seed.
    #[must_use]
    pub fn with_seeded_jitter(mut self, ratio: f64, seed: u64) -> Self {
        self.jitter_ratio = if ratio.is_finite() {
            ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.seed = seed;
        self
    }

    /// Returns the first-attempt delay.
    #[inline]
    #[must_use]
    pub const fn base(&self) -> Duration {
        self.base
    }

    /// Returns the delay cap.
    #[inline]
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Returns the jitter ratio.
    #[inline]
    #[must_use]
    pub const fn jitter_ratio(&self) -> f64 {
        self.jitter_ratio
    }

    /// Unjittered delay for `attempt`.
    fn capped(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base.saturating_mul(factor).min(self.max)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX)
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn next_delay(&self, state: &ReconnectState) -> Duration {
        let attempt = state.attempt_count();
        let capped = self.capped(attempt);

        if self.jitter_ratio <= 0.0 {
            return capped;
        }

        let mut rng = StdRng::seed_from_u64(self.seed ^ u64::from(attempt));
        let factor = 1.0 + rng.random_range(-self.jitter_ratio..=self.jitter_ratio);

        Duration::try_from_secs_f64(capped.as_secs_f64() * factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn state_at(attempts: u32) -> ReconnectState {
        let mut state = ReconnectState::new();
        for _ in 0..attempts {
            state.record_failure(Duration::ZERO, tokio::time::Instant::now());
        }
        state
    }

    fn delays_ms(policy: &dyn ReconnectPolicy, count: u32) -> Vec<u128> {
        (0..count)
            .map(|n| policy.next_delay(&state_at(n)).as_millis())
            .collect()
    }

    #[test]
    fn test_fixed_default_is_5000ms() {
        let policy = FixedDelay::default();
        assert_eq!(delays_ms(&policy, 5), vec![5000; 5]);
    }

    #[test]
    fn test_exponential_sequence_caps() {
        let policy =
            ExponentialBackoff::new(Duration::from_millis(1000), Duration::from_millis(30_000));
        assert_eq!(
            delays_ms(&policy, 8),
            vec![1000, 2000, 4000, 8000, 16000, 30000, 30000, 30000]
        );
    }

    #[test]
    fn test_exponential_no_overflow_at_high_attempts() {
        let policy = ExponentialBackoff::default();
        assert_eq!(
            policy.next_delay(&state_at(200)),
            DEFAULT_BACKOFF_MAX
        );
    }

    #[test]
    fn test_max_never_below_base() {
        let policy = ExponentialBackoff::new(Duration::from_secs(10), Duration::from_secs(1));
        assert_eq!(policy.max(), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_jitter_is_exact() {
        let policy = ExponentialBackoff::default().with_seeded_jitter(0.0, 99);
        assert_eq!(delays_ms(&policy, 3), vec![1000, 2000, 4000]);
    }

    #[test]
    fn test_jitter_ratio_clamped() {
        let policy = ExponentialBackoff::default().with_seeded_jitter(7.5, 1);
        assert_eq!(policy.jitter_ratio(), 1.0);

        let policy = ExponentialBackoff::default().with_seeded_jitter(f64::NAN, 1);
        assert_eq!(policy.jitter_ratio(), 0.0);
    }

    #[test]
    fn test_jitter_varies_by_seed() {
        let a = ExponentialBackoff::default().with_seeded_jitter(0.5, 1);
        let b = ExponentialBackoff::default().with_seeded_jitter(0.5, 2);
        assert_ne!(delays_ms(&a, 6), delays_ms(&b, 6));
    }

    proptest! {
        #[test]
        fn prop_same_state_same_delay(attempts in 0u32..64, seed in any::<u64>(), ratio in 0.0f64..1.0) {
            let policy = ExponentialBackoff::default().with_seeded_jitter(ratio, seed);
            let state = state_at(attempts);
            prop_assert_eq!(policy.next_delay(&state), policy.next_delay(&state));
        }

        #[test]
        fn prop_jitter_bounded(attempts in 0u32..64, seed in any::<u64>(), ratio in 0.0f64..1.0) {
            let policy = ExponentialBackoff::default().with_seeded_jitter(ratio, seed);
            let exact = ExponentialBackoff::default();
            let state = state_at(attempts);

            let delay = policy.next_delay(&state).as_secs_f64();
            let nominal = exact.next_delay(&state).as_secs_f64();

            prop_assert!(delay <= DEFAULT_BACKOFF_MAX.as_secs_f64() + 1e-9);
            prop_assert!(delay >= nominal * (1.0 - ratio) - 1e-6);
        }
    }
}
