//! # Global scheduler configuration.
//!
//! Provides [`Config`], the centralized settings for a [`Scheduler`](crate::Scheduler).
//!
//! Configuration is validated once, at scheduler construction; a zero
//! `rate_limit`, a zero `max_priority`, or a zero interval is rejected with
//! [`SchedulerError::InvalidConfig`] rather than silently producing a
//! scheduler that can never dispatch.

use std::time::Duration;

use crate::error::SchedulerError;

/// Global configuration for a scheduler instance.
///
/// ## Field semantics
/// - `max_priority`: number of priority levels; pushed priorities are clamped
///   into `[1, max_priority]`, lower value served first
/// - `rate_limit`: maximum number of jobs running concurrently
/// - `stats_interval`: cadence of the statistics activity (snapshot + drain detection)
/// - `loop_interval`: cadence of the dispatch activity (queue -> in-flight admission)
///
/// Admission happens only on dispatch ticks, so responsiveness to a freshly
/// pushed job is bounded by `loop_interval`.
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of priority levels (priorities clamp into `[1, max_priority]`).
    pub max_priority: u8,

    /// Maximum number of concurrently running jobs.
    pub rate_limit: usize,

    /// Interval between statistics snapshots.
    pub stats_interval: Duration,

    /// Interval between dispatch ticks.
    pub loop_interval: Duration,
}

impl Config {
    /// Validates the configuration.
    ///
    /// Rejects zero `max_priority`, zero `rate_limit`, and zero intervals.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.max_priority == 0 {
            return Err(SchedulerError::InvalidConfig {
                reason: "max_priority must be at least 1".to_string(),
            });
        }
        if self.rate_limit == 0 {
            return Err(SchedulerError::InvalidConfig {
                reason: "rate_limit must be at least 1".to_string(),
            });
        }
        if self.loop_interval.is_zero() {
            return Err(SchedulerError::InvalidConfig {
                reason: "loop_interval must be non-zero".to_string(),
            });
        }
        if self.stats_interval.is_zero() {
            return Err(SchedulerError::InvalidConfig {
                reason: "stats_interval must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the mid-range priority, used when a push does not specify one.
    ///
    /// For the default `max_priority = 10` this is `5`.
    #[inline]
    pub fn default_priority(&self) -> u8 {
        self.max_priority.div_ceil(2).max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `max_priority = 10`
    /// - `rate_limit = 50`
    /// - `stats_interval = 300ms`
    /// - `loop_interval = 50ms`
    fn default() -> Self {
        Self {
            max_priority: 10,
            rate_limit: 50,
            stats_interval: Duration::from_millis(300),
            loop_interval: Duration::from_millis(50),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.max_priority, 10);
        assert_eq!(cfg.rate_limit, 50);
        assert_eq!(cfg.stats_interval, Duration::from_millis(300));
        assert_eq!(cfg.loop_interval, Duration::from_millis(50));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_default_priority_is_mid_range() {
        let mut cfg = Config::default();
        assert_eq!(cfg.default_priority(), 5);

        cfg.max_priority = 1;
        assert_eq!(cfg.default_priority(), 1);

        cfg.max_priority = 3;
        assert_eq!(cfg.default_priority(), 2);
    }

    #[test]
    fn test_zero_fields_rejected() {
        let mut cfg = Config::default();
        cfg.max_priority = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.rate_limit = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.loop_interval = Duration::ZERO;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.stats_interval = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }
}
