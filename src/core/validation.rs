//! Input and configuration validation utilities.
//!
//! The `validate_*` functions return errors; the `clamp_*` functions repair a
//! value in place of rejecting it and log a warning.

use crate::core::TriageError;
use tracing::warn;

/// Validates that a float value is finite (not NaN or infinite).
#[inline]
pub fn validate_finite(value: f64, param_name: &str) -> Result<(), TriageError> {
    if !value.is_finite() {
        return Err(TriageError::InvalidInput {
            message: format!("Parameter '{param_name}' must be finite, got: {value}"),
        });
    }
    Ok(())
}

/// Validates that a value is within a specified range (inclusive).
#[inline]
pub fn validate_range<T: PartialOrd + std::fmt::Display>(
    value: T,
    min: T,
    max: T,
    param_name: &str,
) -> Result<(), TriageError> {
    if value < min || value > max {
        return Err(TriageError::InvalidInput {
            message: format!(
                "Parameter '{param_name}' must be in range [{min}, {max}], got: {value}"
            ),
        });
    }
    Ok(())
}

/// Validates that a collection is not empty.
#[inline]
pub fn validate_non_empty<T>(items: &[T], param_name: &str) -> Result<(), TriageError> {
    if items.is_empty() {
        return Err(TriageError::InvalidInput {
            message: format!("Parameter '{param_name}' cannot be empty"),
        });
    }
    Ok(())
}

/// Clamps a probability-like threshold into `[0.0, 1.0]`.
pub fn clamp_unit_threshold(threshold: f64, param_name: &str) -> f64 {
    if (0.0..=1.0).contains(&threshold) {
        threshold
    } else if threshold.is_nan() {
        warn!("{param_name} is NaN; using 0.0");
        0.0
    } else {
        warn!("{param_name} out of range [{threshold}], clamping to [0.0, 1.0]");
        threshold.clamp(0.0, 1.0)
    }
}

/// Ensures a size value is at least 1.
pub fn clamp_min_size(size: usize, param_name: &str) -> usize {
    if size >= 1 {
        size
    } else {
        warn!("{param_name} must be >= 1, got {size}; using 1");
        1
    }
}

/// Ensures a duration in milliseconds is at least 1.
pub fn clamp_min_millis(millis: u64, param_name: &str) -> u64 {
    if millis >= 1 {
        millis
    } else {
        warn!("{param_name} must be >= 1ms, got {millis}; using 1");
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_range() {
        assert!(validate_range(0.5, 0.0, 1.0, "accuracy").is_ok());
        assert!(validate_range(1.5, 0.0, 1.0, "accuracy").is_err());
    }

    #[test]
    fn test_validate_finite_rejects_nan() {
        assert!(validate_finite(f64::NAN, "confidence").is_err());
        assert!(validate_finite(0.3, "confidence").is_ok());
    }

    #[test]
    fn test_clamp_unit_threshold() {
        assert_eq!(clamp_unit_threshold(1.7, "high"), 1.0);
        assert_eq!(clamp_unit_threshold(-0.2, "high"), 0.0);
        assert_eq!(clamp_unit_threshold(f64::NAN, "high"), 0.0);
        assert_eq!(clamp_unit_threshold(0.8, "high"), 0.8);
    }

    #[test]
    fn test_clamp_min_size() {
        assert_eq!(clamp_min_size(0, "max_threads"), 1);
        assert_eq!(clamp_min_size(4, "max_threads"), 4);
    }
}
