//! Capped exponential backoff

use std::time::Duration;

use contracts::ReconnectConfig;

/// Reconnect delay generator
///
/// Yields `initial`, `initial * multiplier`, ... capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            multiplier: multiplier.max(1.0),
            current: initial,
        }
    }

    /// Delay for the next attempt, advancing the sequence
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let next = self.current.as_secs_f64() * self.multiplier;
        self.current = if next.is_finite() {
            Duration::from_secs_f64(next.min(self.max.as_secs_f64()))
        } else {
            self.max
        };
        delay
    }

    /// Restart from the initial delay after a successful connect
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl From<&ReconnectConfig> for Backoff {
    fn from(config: &ReconnectConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
            config.multiplier,
        )
    }
}
