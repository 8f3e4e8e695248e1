#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

//! # Heuristic Background Removal
//!
//! Removes plain backgrounds from RGBA images without a model: pixels that
//! look like background (bright and flat, a blue/green screen, or a light
//! neutral gray) get alpha 0, and everything else is left exactly as it was.
//! A Sobel pass over luminance finds object boundaries; pixels on those
//! boundaries are only removed when they are overwhelmingly bright and flat,
//! which keeps outlines intact.
//!
//! ## Features
//!
//! - **Pure pixel math**: deterministic, no model files, no network
//! - **Configurable thresholds**: every constant of the heuristic can be tuned
//! - **Alpha-only edits**: RGB bytes are never modified
//! - **Format Support**: PNG, JPEG and TIFF in; PNG, TIFF or raw RGBA out
//! - **Async reader API**: decode straight from any `AsyncRead`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use heuristic_bgremove::{remove_background_from_bytes, RemovalConfig};
//!
//! # fn example() -> anyhow::Result<()> {
//! let upload = std::fs::read("product.jpg")?;
//! let config = RemovalConfig::default();
//! let result = remove_background_from_bytes(&upload, &config)?;
//! result.save_png("product-cutout.png")?;
//! println!("{}", result.timing_summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Working with raw buffers
//!
//! ```rust
//! use heuristic_bgremove::{remove_background, PixelBuffer, SegmentationConfig};
//!
//! let white = PixelBuffer::filled(8, 8, [255, 255, 255, 255])?;
//! let cutout = remove_background(&white, &SegmentationConfig::default())?;
//! assert!(cutout.pixels().all(|px| px[3] == 0));
//! # Ok::<(), heuristic_bgremove::BgRemovalError>(())
//! ```
//!
//! ### Feature Flags
//!
//! - `logging` (default): `tracing_config` module for installing a subscriber
//! - `tracing-json`: JSON event output

pub mod classify;
pub mod config;
pub mod edge;
pub mod error;
pub mod processor;
pub mod services;
pub mod tracing_config;
pub mod types;
pub mod utils;

use tokio::io::AsyncRead;

// Public API exports
pub use classify::{BackgroundClassifier, BackgroundRule, ColorStats};
pub use config::{
    BackgroundThresholds, GrayThresholds, OutputFormat, RemovalConfig, ScreenThresholds,
    SegmentationConfig, SegmentationConfigBuilder,
};
pub use edge::{luminance, EdgeMap};
pub use error::{BgRemovalError, Result};
pub use processor::{segment, BackgroundRemovalProcessor};
pub use services::{
    ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, OutputFormatHandler,
    ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use types::{
    PixelBuffer, ProcessingMetadata, ProcessingTimings, RemovalResult, SegmentationMask,
};
pub use utils::{BufferValidator, NumericValidator};

pub use tracing_config::{events, spans};
#[cfg(feature = "logging")]
pub use tracing_config::{init_library_tracing, TracingConfig, TracingFormat};

/// Remove the background from a buffer, returning a new buffer
///
/// The input is not modified. The output has the same dimensions and the
/// same RGB bytes; only alpha of background pixels is changed to 0.
///
/// # Errors
/// - `InvalidConfig` if `config` does not validate
pub fn remove_background(buffer: &PixelBuffer, config: &SegmentationConfig) -> Result<PixelBuffer> {
    let mut output = buffer.clone();
    remove_background_in_place(&mut output, config)?;
    Ok(output)
}

/// Remove the background by editing `buffer`'s alpha channel directly
///
/// Returns the mask that was applied.
///
/// # Errors
/// - `InvalidConfig` if `config` does not validate
pub fn remove_background_in_place(
    buffer: &mut PixelBuffer,
    config: &SegmentationConfig,
) -> Result<SegmentationMask> {
    let removal = RemovalConfig::builder()
        .segmentation(config.clone())
        .build()?;
    let mut processor = BackgroundRemovalProcessor::new(removal)?;
    let (mask, _metadata) = processor.process_in_place(buffer)?;
    Ok(mask)
}

/// Remove the background from raw interleaved RGBA bytes
///
/// # Errors
/// - `InvalidInput` if `width` or `height` is 0, or `rgba.len()` is not
///   `width * height * 4`
/// - `InvalidConfig` if `config` does not validate
///
/// # Examples
/// ```rust
/// use heuristic_bgremove::{remove_background_from_rgba, RemovalConfig};
///
/// let rgba = vec![0u8; 3 * 2 * 4];
/// let result = remove_background_from_rgba(3, 2, &rgba, &RemovalConfig::default())?;
/// assert_eq!(result.dimensions(), (3, 2));
///
/// assert!(remove_background_from_rgba(3, 2, &rgba[..20], &RemovalConfig::default()).is_err());
/// # Ok::<(), heuristic_bgremove::BgRemovalError>(())
/// ```
pub fn remove_background_from_rgba(
    width: u32,
    height: u32,
    rgba: &[u8],
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    let mut processor = BackgroundRemovalProcessor::new(config.clone())?;
    processor.process_rgba(width, height, rgba)
}

/// Remove the background from an encoded image (PNG, JPEG or TIFF)
///
/// Inputs larger than `config.max_input_bytes` are rejected before decoding.
///
/// # Examples
/// ```rust,no_run
/// use heuristic_bgremove::{remove_background_from_bytes, OutputFormat, RemovalConfig};
///
/// # fn example(upload_bytes: Vec<u8>) -> anyhow::Result<()> {
/// let config = RemovalConfig::builder()
///     .output_format(OutputFormat::Png)
///     .build()?;
/// let result = remove_background_from_bytes(&upload_bytes, &config)?;
/// let png_bytes = result.to_bytes()?;
/// # Ok(())
/// # }
/// ```
pub fn remove_background_from_bytes(
    image_bytes: &[u8],
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    let mut processor = BackgroundRemovalProcessor::new(config.clone())?;
    processor.process_bytes(image_bytes)
}

/// Remove the background from a `DynamicImage`
///
/// Any pixel type is converted to RGBA8 first.
pub fn remove_background_from_image(
    image: &image::DynamicImage,
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    let mut processor = BackgroundRemovalProcessor::new(config.clone())?;
    processor.process_image(image)
}

/// Remove the background from an image read from an async stream
///
/// At most `config.max_input_bytes + 1` bytes are read; longer streams fail
/// with `InvalidInput`.
///
/// # Examples
/// ```rust,no_run
/// use heuristic_bgremove::{remove_background_from_reader, RemovalConfig};
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let file = File::open("input.jpg").await?;
/// let result = remove_background_from_reader(file, &RemovalConfig::default()).await?;
/// result.save_png("output.png")?;
/// # Ok(())
/// # }
/// ```
pub async fn remove_background_from_reader<R: AsyncRead + Unpin>(
    reader: R,
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    let mut processor = BackgroundRemovalProcessor::new(config.clone())?;
    processor.process_reader(reader).await
}
