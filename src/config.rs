//! Configuration types for background removal operations

use crate::{
    error::{BgRemovalError, Result},
    tracing_config::events,
    utils::NumericValidator,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Default Sobel gradient magnitude above which a pixel counts as an edge
pub const DEFAULT_EDGE_THRESHOLD: f32 = 30.0;

/// Default upload limit accepted by the decoding collaborator (5 MiB)
pub const DEFAULT_MAX_INPUT_BYTES: usize = 5 * 1024 * 1024;

/// A brightness/variance threshold pair for the light, flat background rule
///
/// A pixel satisfies the pair when `brightness > brightness` and
/// `color_variance < variance`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackgroundThresholds {
    /// Mean of R, G and B must exceed this value (0-255)
    pub brightness: f32,
    /// Largest pairwise channel difference must stay below this value (0-255)
    pub variance: f32,
}

impl BackgroundThresholds {
    /// Thresholds applied to pixels away from any detected edge
    pub const LOOSE: Self = Self {
        brightness: 200.0,
        variance: 20.0,
    };

    /// Thresholds applied to pixels on a detected edge
    pub const STRICT: Self = Self {
        brightness: 240.0,
        variance: 15.0,
    };
}

/// A threshold pair as written in a config file, where either half may be
/// left out
#[derive(Deserialize)]
struct PartialThresholds {
    brightness: Option<f32>,
    variance: Option<f32>,
}

impl PartialThresholds {
    fn over(self, base: BackgroundThresholds) -> BackgroundThresholds {
        BackgroundThresholds {
            brightness: self.brightness.unwrap_or(base.brightness),
            variance: self.variance.unwrap_or(base.variance),
        }
    }
}

fn loose_or_default<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BackgroundThresholds, D::Error> {
    PartialThresholds::deserialize(deserializer).map(|p| p.over(BackgroundThresholds::LOOSE))
}

fn strict_or_default<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BackgroundThresholds, D::Error> {
    PartialThresholds::deserialize(deserializer).map(|p| p.over(BackgroundThresholds::STRICT))
}

/// Blue/green screen rule: G and B above `min_channel`, R below both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenThresholds {
    pub min_channel: u8,
}

impl Default for ScreenThresholds {
    fn default() -> Self {
        Self { min_channel: 100 }
    }
}

/// Neutral gray rule: all channel differences below `max_channel_spread`
/// and brightness above `min_brightness`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrayThresholds {
    pub max_channel_spread: u8,
    pub min_brightness: f32,
}

impl Default for GrayThresholds {
    fn default() -> Self {
        Self {
            max_channel_spread: 10,
            min_brightness: 150.0,
        }
    }
}

/// Tunable parameters of the segmentation engine
///
/// Every threshold the algorithm uses lives here; the engine itself carries
/// no numeric constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Sobel magnitude above which an interior pixel is an edge
    pub edge_threshold: f32,

    /// Light/flat rule used for non-edge pixels
    #[serde(deserialize_with = "loose_or_default")]
    pub loose: BackgroundThresholds,

    /// Light/flat rule that replaces every other rule on edge pixels
    #[serde(deserialize_with = "strict_or_default")]
    pub strict: BackgroundThresholds,

    /// Blue/green screen rule (non-edge pixels only)
    pub screen: ScreenThresholds,

    /// Neutral gray rule (non-edge pixels only)
    pub gray: GrayThresholds,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            loose: BackgroundThresholds::LOOSE,
            strict: BackgroundThresholds::STRICT,
            screen: ScreenThresholds::default(),
            gray: GrayThresholds::default(),
        }
    }
}

impl SegmentationConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use heuristic_bgremove::SegmentationConfig;
    ///
    /// let config = SegmentationConfig::builder()
    ///     .edge_threshold(45.0)
    ///     .brightness_threshold(190.0)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.loose.brightness, 190.0);
    /// ```
    #[must_use]
    pub fn builder() -> SegmentationConfigBuilder {
        SegmentationConfigBuilder::default()
    }

    /// Validate all threshold parameters
    ///
    /// # Validation Rules
    ///
    /// - Every float is finite
    /// - Edge threshold: `>= 0`
    /// - Brightness and variance thresholds: 0-255 (inclusive)
    ///
    /// A strict pair that is looser than the loose pair is accepted but logged,
    /// since edge pixels would then be erased more eagerly than flat regions.
    ///
    /// # Errors
    /// - `InvalidConfig` naming the offending parameter and its valid range
    pub fn validate(&self) -> Result<()> {
        if !self.edge_threshold.is_finite() || self.edge_threshold < 0.0 {
            return Err(BgRemovalError::config_value_error(
                "edge threshold",
                self.edge_threshold,
                ">= 0",
                Some(DEFAULT_EDGE_THRESHOLD),
            ));
        }

        validate_channel_value("brightness threshold", self.loose.brightness, 200.0)?;
        validate_channel_value("variance threshold", self.loose.variance, 20.0)?;
        validate_channel_value("strict brightness threshold", self.strict.brightness, 240.0)?;
        validate_channel_value("strict variance threshold", self.strict.variance, 15.0)?;
        validate_channel_value("gray minimum brightness", self.gray.min_brightness, 150.0)?;

        if self.strict.brightness < self.loose.brightness || self.strict.variance > self.loose.variance {
            events::warning_with_recommendation(
                &format!(
                    "strict thresholds {:?} are looser than loose thresholds {:?}; edge pixels will not be protected",
                    self.strict, self.loose
                ),
                "keep strict.brightness >= loose.brightness and strict.variance <= loose.variance",
            );
        }

        Ok(())
    }

    /// Parse and validate a configuration from JSON
    ///
    /// Missing fields fall back to their defaults, including fields missing
    /// from a nested object: a partial `loose` or `strict` pair is completed
    /// from `BackgroundThresholds::LOOSE` or `BackgroundThresholds::STRICT`.
    ///
    /// # Errors
    /// - `InvalidConfig` for malformed JSON or out-of-range values
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            BgRemovalError::invalid_config(format!("Failed to parse segmentation config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty-printed JSON
    ///
    /// # Errors
    /// - `Processing` if serialization fails
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            BgRemovalError::processing(format!("Failed to serialize segmentation config: {}", e))
        })
    }
}

fn validate_channel_value(parameter: &str, value: f32, recommended: f32) -> Result<()> {
    NumericValidator::validate_finite_range(value, 0.0, 255.0, parameter)
        .map(|_| ())
        .map_err(|_| BgRemovalError::config_value_error(parameter, value, "0-255", Some(recommended)))
}

/// Builder for `SegmentationConfig`
#[derive(Debug, Default)]
pub struct SegmentationConfigBuilder {
    config: SegmentationConfig,
}

impl SegmentationConfigBuilder {
    /// Set the Sobel edge magnitude threshold
    #[must_use]
    pub fn edge_threshold(mut self, threshold: f32) -> Self {
        self.config.edge_threshold = threshold;
        self
    }

    /// Set the loose brightness threshold (non-edge pixels)
    #[must_use]
    pub fn brightness_threshold(mut self, threshold: f32) -> Self {
        self.config.loose.brightness = threshold;
        self
    }

    /// Set the loose variance threshold (non-edge pixels)
    #[must_use]
    pub fn variance_threshold(mut self, threshold: f32) -> Self {
        self.config.loose.variance = threshold;
        self
    }

    /// Set the strict brightness threshold (edge pixels)
    #[must_use]
    pub fn strict_brightness_threshold(mut self, threshold: f32) -> Self {
        self.config.strict.brightness = threshold;
        self
    }

    /// Set the strict variance threshold (edge pixels)
    #[must_use]
    pub fn strict_variance_threshold(mut self, threshold: f32) -> Self {
        self.config.strict.variance = threshold;
        self
    }

    /// Set the minimum G and B value for the screen rule
    #[must_use]
    pub fn screen_min_channel(mut self, value: u8) -> Self {
        self.config.screen.min_channel = value;
        self
    }

    /// Set the channel spread below which a pixel counts as neutral gray
    #[must_use]
    pub fn gray_max_channel_spread(mut self, value: u8) -> Self {
        self.config.gray.max_channel_spread = value;
        self
    }

    /// Set the brightness a neutral gray pixel must exceed
    #[must_use]
    pub fn gray_min_brightness(mut self, value: f32) -> Self {
        self.config.gray.min_brightness = value;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - `InvalidConfig` if any threshold is out of range or not finite
    pub fn build(self) -> Result<SegmentationConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// TIFF with alpha channel transparency and lossless compression
    Tiff,
    /// Raw RGBA8 pixel data (4 bytes per pixel)
    Rgba8,
}

/// Configuration for a full background removal run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalConfig {
    /// Engine thresholds
    pub segmentation: SegmentationConfig,

    /// Output format used by `RemovalResult::to_bytes` and `save`
    pub output_format: OutputFormat,

    /// Keep the computed edge map in the result for inspection
    pub debug: bool,

    /// Largest encoded input accepted by the byte and reader entry points
    pub max_input_bytes: usize,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            segmentation: SegmentationConfig::default(),
            output_format: OutputFormat::default(),
            debug: false,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl RemovalConfig {
    /// Create a new configuration builder for fluent API construction
    ///
    /// # Examples
    ///
    /// ```rust
    /// use heuristic_bgremove::{OutputFormat, RemovalConfig};
    ///
    /// let config = RemovalConfig::builder()
    ///     .output_format(OutputFormat::Tiff)
    ///     .edge_threshold(50.0)
    ///     .debug(true)
    ///     .build()
    ///     .unwrap();
    /// assert!(config.debug);
    /// ```
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Any `SegmentationConfig` validation failure
    /// - `max_input_bytes` of zero
    pub fn validate(&self) -> Result<()> {
        self.segmentation.validate()?;

        if self.max_input_bytes == 0 {
            return Err(BgRemovalError::config_value_error(
                "max input bytes",
                self.max_input_bytes,
                ">= 1",
                Some(DEFAULT_MAX_INPUT_BYTES),
            ));
        }

        Ok(())
    }
}

/// Builder for `RemovalConfig`
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    /// Replace the engine thresholds wholesale
    #[must_use]
    pub fn segmentation(mut self, segmentation: SegmentationConfig) -> Self {
        self.config.segmentation = segmentation;
        self
    }

    /// Set the Sobel edge magnitude threshold
    #[must_use]
    pub fn edge_threshold(mut self, threshold: f32) -> Self {
        self.config.segmentation.edge_threshold = threshold;
        self
    }

    /// Set output format
    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Enable debug mode
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Set the largest accepted encoded input size in bytes
    #[must_use]
    pub fn max_input_bytes(mut self, bytes: usize) -> Self {
        self.config.max_input_bytes = bytes;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Any `RemovalConfig::validate` failure
    pub fn build(self) -> Result<RemovalConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}
