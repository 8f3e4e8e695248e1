//! Pixel buffer geometry validation

use super::NumericValidator;
use crate::{
    error::{BgRemovalError, Result},
    types::CHANNELS,
};

/// Validator for RGBA buffer geometry and encoded input sizes
pub struct BufferValidator;

impl BufferValidator {
    /// Byte length an RGBA8 buffer of `width x height` must have
    ///
    /// # Errors
    /// - `InvalidInput` for zero dimensions or a size that overflows `usize`
    pub fn expected_len(width: u32, height: u32) -> Result<usize> {
        NumericValidator::validate_positive(width, "Image width")?;
        NumericValidator::validate_positive(height, "Image height")?;

        let w = NumericValidator::validate_u32_to_usize(width)?;
        let h = NumericValidator::validate_u32_to_usize(height)?;
        let pixels = NumericValidator::safe_multiply_usize(w, h)?;
        NumericValidator::safe_multiply_usize(pixels, CHANNELS)
    }

    /// Check that `actual_len` bytes form a valid `width x height` RGBA8 buffer
    ///
    /// # Errors
    /// - `InvalidInput` for zero dimensions or a length mismatch
    pub fn validate_geometry(width: u32, height: u32, actual_len: usize) -> Result<()> {
        let expected = Self::expected_len(width, height)?;
        if actual_len != expected {
            return Err(BgRemovalError::buffer_size_mismatch(width, height, actual_len));
        }
        Ok(())
    }

    /// Check an encoded upload against the configured size limit
    ///
    /// # Errors
    /// - `InvalidInput` for empty input or input larger than `max_bytes`
    pub fn validate_input_size(len: usize, max_bytes: usize) -> Result<()> {
        if len == 0 {
            return Err(BgRemovalError::invalid_input("Image data is empty"));
        }
        if len > max_bytes {
            return Err(BgRemovalError::invalid_input(format!(
                "Image data is {} bytes, exceeding the {} byte limit",
                len, max_bytes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_len() {
        assert_eq!(BufferValidator::expected_len(1, 1).unwrap(), 4);
        assert_eq!(BufferValidator::expected_len(10, 3).unwrap(), 120);
        assert!(BufferValidator::expected_len(0, 3).is_err());
        assert!(BufferValidator::expected_len(3, 0).is_err());
    }

    #[test]
    fn test_validate_geometry() {
        assert!(BufferValidator::validate_geometry(2, 3, 24).is_ok());

        let err = BufferValidator::validate_geometry(2, 3, 23).unwrap_err();
        assert!(matches!(err, BgRemovalError::InvalidInput(_)));
        assert!(err.to_string().contains("2x3"));
    }

    #[test]
    fn test_validate_input_size() {
        assert!(BufferValidator::validate_input_size(10, 10).is_ok());
        assert!(BufferValidator::validate_input_size(0, 10).is_err());
        assert!(BufferValidator::validate_input_size(11, 10).is_err());
    }
}
