//! Color-heuristic background classification with edge gating

use crate::{
    config::{BackgroundThresholds, SegmentationConfig},
    edge::EdgeMap,
    types::{PixelBuffer, SegmentationMask, CHANNELS},
};

/// Brightness and spread statistics of one RGB triple
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStats {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// `(R + G + B) / 3`
    pub brightness: f32,
    /// `max(|R-G|, |R-B|, |G-B|)`
    pub color_variance: u8,
}

impl ColorStats {
    #[must_use]
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let sum = u16::from(r) + u16::from(g) + u16::from(b);
        let color_variance = r.abs_diff(g).max(r.abs_diff(b)).max(g.abs_diff(b));
        Self {
            r,
            g,
            b,
            brightness: f32::from(sum) / 3.0,
            color_variance,
        }
    }

    /// Light, flat tone under `thresholds`
    #[must_use]
    pub fn is_light_flat(&self, thresholds: &BackgroundThresholds) -> bool {
        self.brightness > thresholds.brightness && f32::from(self.color_variance) < thresholds.variance
    }
}

/// Which rule, if any, marked a pixel as background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundRule {
    /// Bright with little color spread
    LightFlat,
    /// Blue/green chroma-key screen
    Screen,
    /// Bright neutral gray
    NeutralGray,
    /// Overwhelmingly bright and flat pixel on an edge
    StrictEdge,
}

/// Applies the classification rules of a `SegmentationConfig`
#[derive(Debug, Clone, Copy)]
pub struct BackgroundClassifier<'a> {
    config: &'a SegmentationConfig,
}

impl<'a> BackgroundClassifier<'a> {
    #[must_use]
    pub fn new(config: &'a SegmentationConfig) -> Self {
        Self { config }
    }

    /// Loose rules for pixels away from edges; first match wins
    #[must_use]
    pub fn loose_rule(&self, stats: &ColorStats) -> Option<BackgroundRule> {
        if stats.is_light_flat(&self.config.loose) {
            return Some(BackgroundRule::LightFlat);
        }

        let min = self.config.screen.min_channel;
        if stats.g > min && stats.b > min && stats.r < stats.g && stats.r < stats.b {
            return Some(BackgroundRule::Screen);
        }

        let spread = self.config.gray.max_channel_spread;
        if stats.r.abs_diff(stats.g) < spread
            && stats.r.abs_diff(stats.b) < spread
            && stats.g.abs_diff(stats.b) < spread
            && stats.brightness > self.config.gray.min_brightness
        {
            return Some(BackgroundRule::NeutralGray);
        }

        None
    }

    /// Strict rule that replaces the loose rules on edge pixels
    #[must_use]
    pub fn strict_rule(&self, stats: &ColorStats) -> Option<BackgroundRule> {
        stats
            .is_light_flat(&self.config.strict)
            .then_some(BackgroundRule::StrictEdge)
    }

    /// Rule that classifies `(r, g, b)` as background, given edge membership
    #[must_use]
    pub fn matching_rule(&self, r: u8, g: u8, b: u8, on_edge: bool) -> Option<BackgroundRule> {
        let stats = ColorStats::from_rgb(r, g, b);
        if on_edge {
            self.strict_rule(&stats)
        } else {
            self.loose_rule(&stats)
        }
    }

    #[must_use]
    pub fn is_background(&self, r: u8, g: u8, b: u8, on_edge: bool) -> bool {
        self.matching_rule(r, g, b, on_edge).is_some()
    }

    /// Classify every pixel of `buffer`, consulting `edges` for gating
    ///
    /// Only RGB is read; the existing alpha never affects the decision.
    #[must_use]
    pub fn classify(&self, buffer: &PixelBuffer, edges: &EdgeMap) -> SegmentationMask {
        let data = buffer
            .as_bytes()
            .chunks_exact(CHANNELS)
            .enumerate()
            .map(|(i, px)| {
                if self.is_background(px[0], px[1], px[2], edges.is_edge_index(i)) {
                    SegmentationMask::BACKGROUND
                } else {
                    SegmentationMask::FOREGROUND
                }
            })
            .collect();
        SegmentationMask::new(data, buffer.dimensions())
    }
}
