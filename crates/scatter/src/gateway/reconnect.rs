//! Reconnection configuration and exponential backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for reconnection behavior.
///
/// Retries are unbounded and carry no jitter: the delay starts at
/// `initial_delay_ms`, doubles after every failed connection and never
/// exceeds `max_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt, in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
        }
    }
}

impl ReconnectConfig {
    /// Create a config from floor and ceiling durations.
    #[must_use]
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay_ms: initial_delay.as_millis() as u64,
            max_delay_ms: max_delay.as_millis() as u64,
        }
    }

    /// Delay floor.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Delay ceiling.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Delay after `failures` consecutive failed connections:
/// `min(initial_delay * 2^failures, max_delay)`.
#[must_use]
pub fn calculate_backoff(failures: u32, initial_delay: Duration, max_delay: Duration) -> Duration {
    let factor = 2u32.checked_pow(failures).unwrap_or(u32::MAX);
    initial_delay
        .checked_mul(factor)
        .unwrap_or(max_delay)
        .min(max_delay)
}

/// Backoff state owned by a single gateway.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Backoff {
    /// Create backoff state starting at the floor.
    ///
    /// A ceiling below the floor is raised to the floor.
    #[must_use]
    pub fn new(config: &ReconnectConfig) -> Self {
        let floor = config.initial_delay();
        let ceiling = config.max_delay().max(floor);
        Self {
            floor,
            ceiling,
            current: floor,
        }
    }

    /// The delay the next failure will wait.
    #[must_use]
    pub const fn current(&self) -> Duration {
        self.current
    }

    /// Return the delay to wait now and double the stored one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .checked_mul(2)
            .unwrap_or(self.ceiling)
            .min(self.ceiling);
        delay
    }

    /// Drop back to the floor after a successful authentication.
    pub fn reset(&mut self) {
        self.current = self.floor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reconnect_config_default() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay(), Duration::from_secs(1));
        assert_eq!(config.max_delay(), Duration::from_secs(60));
    }

    #[test]
    fn test_next_delay_doubles_until_capped() {
        let mut backoff = Backoff::new(&ReconnectConfig::default());

        let waits: Vec<u64> = (0..8).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(waits, vec![1, 2, 4, 8, 16, 32, 60, 60]);
        assert_eq!(backoff.current(), Duration::from_secs(60));
    }

    #[test]
    fn test_reset_returns_to_floor() {
        let mut backoff = Backoff::new(&ReconnectConfig::new(
            Duration::from_millis(100),
            Duration::from_secs(10),
        ));
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.current(), Duration::from_millis(400));

        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_millis(100));
    }

    #[test]
    fn test_ceiling_below_floor_is_raised() {
        let mut backoff = Backoff::new(&ReconnectConfig::new(
            Duration::from_secs(5),
            Duration::from_secs(1),
        ));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
        assert_eq!(backoff.current(), Duration::from_secs(5));
    }

    #[test]
    fn test_calculate_backoff() {
        let initial = Duration::from_millis(100);
        let max = Duration::from_secs(10);

        assert_eq!(calculate_backoff(0, initial, max), Duration::from_millis(100));
        assert_eq!(calculate_backoff(1, initial, max), Duration::from_millis(200));
        assert_eq!(calculate_backoff(3, initial, max), Duration::from_millis(800));
        assert_eq!(calculate_backoff(10, initial, max), Duration::from_secs(10)); // capped
        assert_eq!(calculate_backoff(200, initial, max), Duration::from_secs(10));
    }

    proptest! {
        #[test]
        fn backoff_after_k_failures_matches_formula(
            floor_ms in 1u64..5_000,
            extra_ms in 0u64..120_000,
            failures in 0u32..40,
        ) {
            let config = ReconnectConfig {
                initial_delay_ms: floor_ms,
                max_delay_ms: floor_ms + extra_ms,
            };
            let mut backoff = Backoff::new(&config);
            for _ in 0..failures {
                backoff.next_delay();
            }

            let expected =
                calculate_backoff(failures, config.initial_delay(), config.max_delay());
            prop_assert_eq!(backoff.current(), expected);
            prop_assert!(backoff.current() >= config.initial_delay());
            prop_assert!(backoff.current() <= config.max_delay());

            backoff.reset();
            prop_assert_eq!(backoff.current(), config.initial_delay());
        }
    }
}
