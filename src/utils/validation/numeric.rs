//! Numeric validation utilities
//!
//! Provides overflow-checked arithmetic and range validation so that pixel
//! counts derived from caller-supplied dimensions never wrap.

use crate::error::{BgRemovalError, Result};

/// Validator for numeric operations and conversions
pub struct NumericValidator;

impl NumericValidator {
    /// Safely multiply two usize values checking for overflow
    pub fn safe_multiply_usize(a: usize, b: usize) -> Result<usize> {
        a.checked_mul(b).ok_or_else(|| {
            BgRemovalError::invalid_input(format!("Multiplication overflow: {} * {}", a, b))
        })
    }

    /// Safely convert u32 to usize with bounds checking
    pub fn validate_u32_to_usize(value: u32) -> Result<usize> {
        usize::try_from(value).map_err(|_| {
            BgRemovalError::invalid_input(format!(
                "Value {} exceeds usize::MAX on this platform ({})",
                value,
                usize::MAX
            ))
        })
    }

    /// Validate that a value is positive
    pub fn validate_positive<T>(value: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy + Default,
    {
        if value <= T::default() {
            return Err(BgRemovalError::invalid_input(format!(
                "{} must be positive, got {}",
                name, value
            )));
        }
        Ok(value)
    }

    /// Validate a finite float within an inclusive range
    pub fn validate_finite_range(value: f32, min: f32, max: f32, name: &str) -> Result<f32> {
        if !value.is_finite() {
            return Err(BgRemovalError::invalid_config(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }

        if value < min || value > max {
            return Err(BgRemovalError::invalid_config(format!(
                "{} must be between {} and {}, got {}",
                name, min, max, value
            )));
        }

        Ok(value)
    }
}
