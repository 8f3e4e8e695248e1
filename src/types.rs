//! Core types for background removal operations

use crate::{
    config::OutputFormat,
    edge::EdgeMap,
    error::{BgRemovalError, Result},
    services::ImageIOService,
};
use chrono::{DateTime, Utc};
use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of interleaved channels per pixel (R, G, B, A)
pub const CHANNELS: usize = 4;

/// Index of the alpha channel within a pixel
pub const ALPHA: usize = 3;

/// A decoded RGBA8 image stored row-major with stride `width * 4`
///
/// The length invariant `data.len() == width * height * 4` and the
/// `width, height >= 1` requirement are checked by every constructor, so a
/// `PixelBuffer` in hand is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, validating geometry
    ///
    /// # Errors
    /// - `InvalidInput` when either dimension is zero or the byte count
    ///   does not equal `width * height * 4`
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        crate::utils::BufferValidator::validate_geometry(width, height, data.len())?;
        Ok(Self { width, height, data })
    }

    /// Create a buffer with every pixel set to `rgba`
    ///
    /// # Errors
    /// - `InvalidInput` when either dimension is zero
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let len = crate::utils::BufferValidator::expected_len(width, height)?;
        let data = rgba.iter().copied().cycle().take(len).collect();
        Self::new(width, height, data)
    }

    /// Copy the pixels of a decoded `image` crate buffer
    ///
    /// # Errors
    /// - `InvalidInput` for a zero-sized image
    pub fn from_rgba_image(image: &RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.as_raw().clone())
    }

    /// Take over the pixels of a decoded `image` crate buffer without copying
    ///
    /// # Errors
    /// - `InvalidInput` for a zero-sized image
    pub fn from_rgba_image_owned(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }

    /// Convert into an `image` crate buffer for encoding
    #[must_use]
    pub fn into_rgba_image(self) -> RgbaImage {
        // Geometry was validated on construction
        RgbaImage::from_raw(self.width, self.height, self.data)
            .unwrap_or_else(|| RgbaImage::new(0, 0))
    }

    /// Clone into an `image` crate buffer for encoding
    #[must_use]
    pub fn to_rgba_image(&self) -> RgbaImage {
        self.clone().into_rgba_image()
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels (`width * height`)
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.data.len() / CHANNELS
    }

    /// Raw interleaved RGBA bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return its bytes
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Iterate over pixels as `[R, G, B, A]` slices in row-major order
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.data.chunks_exact(CHANNELS)
    }

    /// RGBA value at `(x, y)`, or `None` outside the image
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let px = self.data.get(offset..offset + CHANNELS)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Overwrite the RGBA value at `(x, y)`; out-of-range coordinates are ignored
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        if let Some(px) = self.data.get_mut(offset..offset + CHANNELS) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Alpha of the pixel with linear index `index`
    #[must_use]
    pub fn alpha_at(&self, index: usize) -> Option<u8> {
        self.data.get(index * CHANNELS + ALPHA).copied()
    }

    /// Mutable access to the interleaved bytes for in-place alpha edits
    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Per-pixel foreground/background decision produced by classification
///
/// Stored as grayscale: 255 for foreground, 0 for background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    /// Mask data as grayscale values (0 or 255)
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Mask value for a pixel kept opaque
    pub const FOREGROUND: u8 = 255;
    /// Mask value for a pixel made transparent
    pub const BACKGROUND: u8 = 0;

    /// Create a new segmentation mask
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Whether the pixel with linear index `index` is background
    #[must_use]
    pub fn is_background(&self, index: usize) -> bool {
        self.data.get(index) == Some(&Self::BACKGROUND)
    }

    /// Number of pixels classified as background
    #[must_use]
    pub fn background_count(&self) -> usize {
        self.data.iter().filter(|&&v| v == Self::BACKGROUND).count()
    }

    /// Fraction of pixels classified as background (0.0 to 1.0)
    #[must_use]
    pub fn background_ratio(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.background_count() as f32 / self.data.len() as f32
    }

    /// Convert mask to a grayscale image
    ///
    /// # Errors
    /// - `Processing` if the data length disagrees with the dimensions
    pub fn to_image(&self) -> Result<GrayImage> {
        let (width, height) = self.dimensions;
        GrayImage::from_raw(width, height, self.data.clone())
            .ok_or_else(|| BgRemovalError::processing("Failed to create image from mask data"))
    }

    /// Zero the alpha of every background pixel in `buffer`
    ///
    /// Foreground pixels keep whatever alpha they had.
    ///
    /// # Errors
    /// - `InvalidInput` if mask and buffer dimensions differ
    pub fn apply_to_buffer(&self, buffer: &mut PixelBuffer) -> Result<()> {
        if self.dimensions != buffer.dimensions() {
            return Err(BgRemovalError::invalid_input(format!(
                "Mask dimensions {}x{} don't match buffer dimensions {}x{}",
                self.dimensions.0,
                self.dimensions.1,
                buffer.width(),
                buffer.height()
            )));
        }

        for (pixel, &decision) in buffer
            .as_bytes_mut()
            .chunks_exact_mut(CHANNELS)
            .zip(&self.data)
        {
            if decision == Self::BACKGROUND {
                pixel[ALPHA] = 0;
            }
        }
        Ok(())
    }
}

/// Detailed timing breakdown for a removal run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Decoding the input (0 when a buffer was supplied directly)
    pub image_decode_ms: u64,
    /// Sobel pass over luminance
    pub edge_detection_ms: u64,
    /// Per-pixel rule evaluation
    pub classification_ms: u64,
    /// Writing alpha into the output buffer
    pub alpha_write_ms: u64,
    /// Wall time of the whole run
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Percentage of total time spent in each engine stage
    /// (edge detection, classification, alpha write)
    #[must_use]
    pub fn breakdown_percentages(&self) -> (f64, f64, f64) {
        if self.total_ms == 0 {
            return (0.0, 0.0, 0.0);
        }
        let total = self.total_ms as f64;
        (
            self.edge_detection_ms as f64 / total * 100.0,
            self.classification_ms as f64 / total * 100.0,
            self.alpha_write_ms as f64 / total * 100.0,
        )
    }
}

/// Metadata describing a removal run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// Stage timings
    pub timings: ProcessingTimings,
    /// Interior pixels flagged as edges
    pub edge_pixels: usize,
    /// Pixels whose alpha was set to 0
    pub background_pixels: usize,
    /// Total pixels processed
    pub total_pixels: usize,
    /// When processing finished
    pub processed_at: DateTime<Utc>,
}

impl ProcessingMetadata {
    #[must_use]
    pub fn new(total_pixels: usize) -> Self {
        Self {
            timings: ProcessingTimings::default(),
            edge_pixels: 0,
            background_pixels: 0,
            total_pixels,
            processed_at: Utc::now(),
        }
    }
}

/// Result of a background removal operation
#[derive(Debug, Clone)]
pub struct RemovalResult {
    /// Output buffer; same dimensions as the input, alpha edited
    pub buffer: PixelBuffer,

    /// Classification used for the alpha write
    pub mask: SegmentationMask,

    /// Edge map, kept only when debug mode is on
    pub edge_map: Option<EdgeMap>,

    /// Processing metadata
    pub metadata: ProcessingMetadata,

    /// Format used by `to_bytes` and `save` when none is given
    pub output_format: OutputFormat,
}

impl RemovalResult {
    /// Get image dimensions
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Get detailed timing breakdown
    #[must_use]
    pub fn timings(&self) -> &ProcessingTimings {
        &self.metadata.timings
    }

    /// Take ownership of the output buffer
    #[must_use]
    pub fn into_buffer(self) -> PixelBuffer {
        self.buffer
    }

    /// Encode the output in the configured format
    ///
    /// # Errors
    /// - `Image` if the encoder fails
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        ImageIOService::encode(&self.buffer, self.output_format)
    }

    /// Encode the output in an explicit format
    ///
    /// # Errors
    /// - `Image` if the encoder fails
    pub fn to_bytes_as(&self, format: OutputFormat) -> Result<Vec<u8>> {
        ImageIOService::encode(&self.buffer, format)
    }

    /// Save the result as PNG with alpha channel
    ///
    /// # Errors
    /// - `Io` or `Image` on write failure
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        ImageIOService::save_buffer(&self.buffer, path, OutputFormat::Png)
    }

    /// Save in the configured format
    ///
    /// # Errors
    /// - `Io` or `Image` on write failure
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        ImageIOService::save_buffer(&self.buffer, path, self.output_format)
    }

    /// Get timing summary for display
    #[must_use]
    pub fn timing_summary(&self) -> String {
        let t = &self.metadata.timings;
        let (edge_pct, class_pct, alpha_pct) = t.breakdown_percentages();
        format!(
            "{}x{} in {}ms (edges {}ms {:.1}%, classify {}ms {:.1}%, alpha {}ms {:.1}%), {}/{} pixels removed",
            self.buffer.width(),
            self.buffer.height(),
            t.total_ms,
            t.edge_detection_ms,
            edge_pct,
            t.classification_ms,
            class_pct,
            t.alpha_write_ms,
            alpha_pct,
            self.metadata.background_pixels,
            self.metadata.total_pixels
        )
    }
}
