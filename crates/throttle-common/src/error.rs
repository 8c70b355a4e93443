//! Error types for Throttle.

use thiserror::Error;

/// Invalid configuration values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// A numeric field is out of its valid range
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The lane table has no entries
    #[error("lane table is empty")]
    EmptyLaneTable,

    /// Lane centers are not finite and strictly ascending
    #[error("lane centers must be finite and strictly ascending: {0:?}")]
    UnorderedLanes(Vec<f32>),
}

impl ConfigError {
    /// Convenience constructor for [`ConfigError::InvalidValue`].
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Checks that `value` is finite and strictly positive.
pub fn require_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be > 0, got {value}")))
    }
}

/// Checks that `value` is finite and not negative.
pub fn require_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be >= 0, got {value}")))
    }
}

/// Checks that `value` is a probability in `[0, 1]`.
pub fn require_probability(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be within [0, 1], got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_helpers() {
        assert!(require_positive("x", 1.0).is_ok());
        assert!(require_positive("x", 0.0).is_err());
        assert!(require_positive("x", f32::NAN).is_err());
        assert!(require_non_negative("x", 0.0).is_ok());
        assert!(require_probability("p", 1.5).is_err());
    }

    #[test]
    fn test_invalid_value_names_field() {
        let err = require_probability("traffic.truck_probability", 2.0).expect_err("out of range");
        assert_eq!(
            err.to_string(),
            "invalid value for `traffic.truck_probability`: must be within [0, 1], got 2"
        );
    }
}
