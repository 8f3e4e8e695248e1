//! Output format handling service
//!
//! Maps `OutputFormat` onto file extensions, MIME types and `image` crate
//! encoders for the output collaborator.

use crate::config::OutputFormat;

/// Service for handling output format properties
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Get the appropriate file extension for a given output format
    ///
    /// # Examples
    /// ```rust
    /// use heuristic_bgremove::{services::OutputFormatHandler, config::OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Rgba8), "raw");
    /// ```
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Rgba8 => "raw",
        }
    }

    /// MIME type served alongside the encoded bytes
    #[must_use]
    pub fn mime_type(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "image/png",
            OutputFormat::Tiff => "image/tiff",
            OutputFormat::Rgba8 => "application/octet-stream",
        }
    }

    /// Check if a format supports transparency (alpha channel)
    ///
    /// Every format offered here keeps alpha; the check exists so callers
    /// adding formats are forced to decide.
    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png | OutputFormat::Tiff | OutputFormat::Rgba8 => true,
        }
    }

    /// `image` crate encoder for the format, `None` for raw bytes
    #[must_use]
    pub fn image_format(format: OutputFormat) -> Option<image::ImageFormat> {
        match format {
            OutputFormat::Png => Some(image::ImageFormat::Png),
            OutputFormat::Tiff => Some(image::ImageFormat::Tiff),
            OutputFormat::Rgba8 => None,
        }
    }

    /// Guess an output format from a path's extension (PNG when unknown)
    #[must_use]
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> OutputFormat {
        match path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("tif" | "tiff") => OutputFormat::Tiff,
            Some("raw" | "rgba") => OutputFormat::Rgba8,
            _ => OutputFormat::Png,
        }
    }
}
