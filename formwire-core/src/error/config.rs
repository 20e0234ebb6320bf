//! Configuration validation error types.
//!
//! Client and analytics configs expose a `validate()` method returning
//! `Result<ValidationResult, ConfigValidationError>`: an `Err` rejects the
//! configuration, an `Ok` may still carry warnings worth logging.

use std::fmt;
use thiserror::Error;

/// A configuration field failed validation.
///
/// ```rust
/// use formwire_core::error::ConfigValidationError;
///
/// let err = ConfigValidationError::too_low("base_delay", "5ms", "10ms");
/// assert_eq!(err.field_name(), "base_delay");
/// assert!(err.to_string().contains("below minimum"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigValidationError {
    /// Field value exceeds the maximum allowed value.
    #[error("Field '{field}' value {value} exceeds maximum {max}")]
    ValueTooHigh {
        /// The name of the configuration field
        field: &'static str,
        /// The actual value that was provided
        value: String,
        /// The maximum allowed value
        max: String,
    },

    /// Field value is below the minimum allowed value.
    #[error("Field '{field}' value {value} is below minimum {min}")]
    ValueTooLow {
        /// The name of the configuration field
        field: &'static str,
        /// The actual value that was provided
        value: String,
        /// The minimum allowed value
        min: String,
    },

    /// Field value is invalid for reasons other than range.
    #[error("Field '{field}' has invalid value: {reason}")]
    ValueInvalid {
        /// The name of the configuration field
        field: &'static str,
        /// The reason why the value is invalid
        reason: String,
    },

    /// Required field is missing.
    #[error("Required field '{field}' is missing")]
    ValueMissing {
        /// The name of the missing configuration field
        field: &'static str,
    },
}

impl ConfigValidationError {
    /// Returns the field name associated with this error.
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        match self {
            ConfigValidationError::ValueTooHigh { field, .. }
            | ConfigValidationError::ValueTooLow { field, .. }
            | ConfigValidationError::ValueInvalid { field, .. }
            | ConfigValidationError::ValueMissing { field } => field,
        }
    }

    /// Creates a new `ValueTooHigh` error.
    pub fn too_high<V: fmt::Display, M: fmt::Display>(
        field: &'static str,
        value: V,
        max: M,
    ) -> Self {
        ConfigValidationError::ValueTooHigh {
            field,
            value: value.to_string(),
            max: max.to_string(),
        }
    }

    /// Creates a new `ValueTooLow` error.
    pub fn too_low<V: fmt::Display, M: fmt::Display>(
        field: &'static str,
        value: V,
        min: M,
    ) -> Self {
        ConfigValidationError::ValueTooLow {
            field,
            value: value.to_string(),
            min: min.to_string(),
        }
    }

    /// Creates a new `ValueInvalid` error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigValidationError::ValueInvalid {
            field,
            reason: reason.into(),
        }
    }

    /// Creates a new `ValueMissing` error.
    pub fn missing(field: &'static str) -> Self {
        ConfigValidationError::ValueMissing { field }
    }
}

/// Result of a successful configuration validation, with non-fatal warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Warnings generated during validation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Creates a new empty validation result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning to the validation result.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Returns `true` if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Merges another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mentions_field_and_values() {
        let err = ConfigValidationError::too_high("max_reconnect_attempts", 1000, 100);
        let msg = err.to_string();
        assert!(msg.contains("max_reconnect_attempts"));
        assert!(msg.contains("1000"));
        assert!(msg.contains("100"));

        let err = ConfigValidationError::missing("url");
        assert!(err.to_string().contains("url"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_field_name() {
        assert_eq!(
            ConfigValidationError::too_low("base_delay", 5, 10).field_name(),
            "base_delay"
        );
        assert_eq!(
            ConfigValidationError::invalid("jitter_factor", "must be within [0, 1]").field_name(),
            "jitter_factor"
        );
    }

    #[test]
    fn test_validation_result_merge() {
        let mut first = ValidationResult::new();
        first.add_warning("ping_interval is shorter than 1s");

        let mut second = ValidationResult::new();
        second.add_warning("jitter disabled");
        second.add_warning("reconnect disabled");

        first.merge(second);
        assert_eq!(first.warnings.len(), 3);
        assert!(first.has_warnings());
    }
}
