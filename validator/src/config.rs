//! Validator configuration.

use std::time::Duration;

use crate::error::ValidationError;

pub const SAMPLE_COUNT_MIN: usize = 10;
pub const SAMPLE_COUNT_DEFAULT: usize = 30;
pub const SAMPLE_COUNT_MAX: usize = 3000;

pub const TIMEOUT_MS_MIN: u64 = 100;
pub const TIMEOUT_MS_DEFAULT: u64 = 1000;
pub const TIMEOUT_MS_MAX: u64 = 3000;

/// Per-point collection limits.
///
/// Constructed through [`ValidatorConfig::new`] so the bounds always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Valid samples required before a point is complete.
    sample_count: usize,
    /// Collection time allowed per point (ms).
    timeout_ms: u64,
}

impl ValidatorConfig {
    /// Validate and build a configuration.
    ///
    /// The sample count is checked before the timeout.
    pub fn new(sample_count: usize, timeout_ms: u64) -> Result<Self, ValidationError> {
        if !(SAMPLE_COUNT_MIN..=SAMPLE_COUNT_MAX).contains(&sample_count) {
            return Err(ValidationError::InvalidSampleCount(sample_count));
        }
        if !(TIMEOUT_MS_MIN..=TIMEOUT_MS_MAX).contains(&timeout_ms) {
            return Err(ValidationError::InvalidTimeout(timeout_ms));
        }
        Ok(Self {
            sample_count,
            timeout_ms,
        })
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            sample_count: SAMPLE_COUNT_DEFAULT,
            timeout_ms: TIMEOUT_MS_DEFAULT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let c = ValidatorConfig::default();
        assert_eq!(c.sample_count(), 30);
        assert_eq!(c.timeout_ms(), 1000);
        assert_eq!(c.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(ValidatorConfig::new(10, 100).is_ok());
        assert!(ValidatorConfig::new(3000, 3000).is_ok());
    }

    #[test]
    fn test_sample_count_out_of_range() {
        assert!(matches!(
            ValidatorConfig::new(9, 1000),
            Err(ValidationError::InvalidSampleCount(9))
        ));
        assert!(matches!(
            ValidatorConfig::new(3001, 1000),
            Err(ValidationError::InvalidSampleCount(3001))
        ));
    }

    #[test]
    fn test_timeout_out_of_range() {
        assert!(matches!(
            ValidatorConfig::new(30, 99),
            Err(ValidationError::InvalidTimeout(99))
        ));
        assert!(matches!(
            ValidatorConfig::new(30, 3001),
            Err(ValidationError::InvalidTimeout(3001))
        ));
    }

    #[test]
    fn test_sample_count_checked_first() {
        assert!(matches!(
            ValidatorConfig::new(1, 1),
            Err(ValidationError::InvalidSampleCount(1))
        ));
    }
}
