//! Image I/O operations service
//!
//! Decoding and encoding live here, outside the engine, so the engine only
//! ever sees validated `PixelBuffer`s.

use crate::{
    config::OutputFormat,
    error::{BgRemovalError, Result},
    services::OutputFormatHandler,
    tracing_config::spans,
    types::PixelBuffer,
    utils::BufferValidator,
};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// Input formats accepted by the decoder
pub const SUPPORTED_INPUT_FORMATS: [ImageFormat; 3] =
    [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Tiff];

/// Service for handling image decoding and encoding
pub struct ImageIOService;

impl ImageIOService {
    /// Decode an uploaded image into an RGBA pixel buffer
    ///
    /// # Arguments
    /// * `bytes` - Encoded image data (PNG, JPEG or TIFF)
    /// * `max_bytes` - Upload limit; larger inputs are rejected before decoding
    ///
    /// # Errors
    /// - `InvalidInput` for empty or oversized input
    /// - `UnsupportedFormat` when the content is not a supported image type
    /// - `Processing` when the decoder fails
    ///
    /// # Examples
    /// ```rust,no_run
    /// use heuristic_bgremove::services::ImageIOService;
    ///
    /// let data = std::fs::read("input.jpg")?;
    /// let buffer = ImageIOService::load_from_bytes(&data, 5 * 1024 * 1024)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_from_bytes(bytes: &[u8], max_bytes: usize) -> Result<PixelBuffer> {
        BufferValidator::validate_input_size(bytes.len(), max_bytes)?;

        let format = image::guess_format(bytes).map_err(|_| {
            BgRemovalError::unsupported_format("content is not a recognised image")
        })?;
        if !SUPPORTED_INPUT_FORMATS.contains(&format) {
            return Err(BgRemovalError::unsupported_format(format!(
                "{:?} (supported: PNG, JPEG, TIFF)",
                format
            )));
        }

        let image = image::load_from_memory_with_format(bytes, format).map_err(|e| {
            BgRemovalError::processing_stage_error(
                "image decoding",
                &e.to_string(),
                Some(&format!("format: {:?}, size: {} bytes", format, bytes.len())),
            )
        })?;

        log::debug!(
            "Decoded {:?} image {}x{} from {} bytes",
            format,
            image.width(),
            image.height(),
            bytes.len()
        );

        PixelBuffer::from_rgba_image_owned(image.into_rgba8())
    }

    /// Load an image file into an RGBA pixel buffer
    ///
    /// # Errors
    /// - `Io` when the file is missing or unreadable
    /// - Everything `load_from_bytes` returns
    pub fn load_image<P: AsRef<Path>>(path: P, max_bytes: usize) -> Result<PixelBuffer> {
        let path_ref = path.as_ref();
        let extension = path_ref.extension().and_then(|e| e.to_str()).unwrap_or("unknown");
        let _span = spans::file_processing(path_ref, extension).entered();

        if !path_ref.exists() {
            return Err(BgRemovalError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        if !Self::is_supported_format(path_ref) {
            log::debug!(
                "Unrecognised extension on {}; relying on content detection",
                path_ref.display()
            );
        }

        let data = std::fs::read(path_ref)
            .map_err(|e| BgRemovalError::file_io_error("read image data", path_ref, &e))?;
        Self::load_from_bytes(&data, max_bytes)
    }

    /// Encode a buffer in the requested output format
    ///
    /// # Errors
    /// - `Image` if the encoder fails
    pub fn encode(buffer: &PixelBuffer, format: OutputFormat) -> Result<Vec<u8>> {
        let Some(image_format) = OutputFormatHandler::image_format(format) else {
            return Ok(buffer.as_bytes().to_vec());
        };

        let image = DynamicImage::ImageRgba8(buffer.to_rgba_image());
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), image_format)?;
        Ok(bytes)
    }

    /// Save a buffer to a file in the requested format
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    /// - `Io` when the directory or file cannot be written
    /// - `Image` if the encoder fails
    pub fn save_buffer<P: AsRef<Path>>(
        buffer: &PixelBuffer,
        path: P,
        format: OutputFormat,
    ) -> Result<()> {
        let path_ref = path.as_ref();
        let _span =
            spans::file_processing(path_ref, OutputFormatHandler::get_extension(format)).entered();

        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    BgRemovalError::file_io_error("create output directory", parent, &e)
                })?;
            }
        }

        let bytes = Self::encode(buffer, format)?;
        std::fs::write(path_ref, bytes)
            .map_err(|e| BgRemovalError::file_io_error("write output image", path_ref, &e))
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .is_some_and(|ext| matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "tif" | "tiff"))
    }

    /// Check an upload's declared MIME type; anything under `image/` is accepted
    /// here and narrowed later by content detection
    #[must_use]
    pub fn is_image_mime_type(mime: &str) -> bool {
        mime.trim().to_ascii_lowercase().starts_with("image/")
    }
}
