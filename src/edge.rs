//! Sobel edge detection over perceptual luminance
//!
//! Coordinate convention: arrays are indexed `[[y, x]]` (row, column), matching
//! the row-major layout of `PixelBuffer`.
//!
//! Only interior pixels get a gradient. Row/column 0 and the last row/column
//! have no full 3x3 neighbourhood and are never marked, so images narrower or
//! shorter than 3 pixels produce an empty edge map.

use crate::types::{PixelBuffer, CHANNELS};
use image::GrayImage;
use ndarray::Array2;

/// Luminance weights for R, G and B
pub const LUMA_WEIGHTS: [f32; 3] = [0.3, 0.59, 0.11];

/// Horizontal Sobel kernel, indexed `[dy][dx]`
const SOBEL_X: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];

/// Vertical Sobel kernel, indexed `[dy][dx]`
const SOBEL_Y: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Perceptual luminance of an RGB triple
#[inline]
#[must_use]
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    LUMA_WEIGHTS[0] * f32::from(r) + LUMA_WEIGHTS[1] * f32::from(g) + LUMA_WEIGHTS[2] * f32::from(b)
}

/// Luminance plane of a buffer; alpha is ignored
#[must_use]
pub fn luminance_plane(buffer: &PixelBuffer) -> Array2<f32> {
    let (w, h) = (buffer.width() as usize, buffer.height() as usize);
    let values: Vec<f32> = buffer
        .as_bytes()
        .chunks_exact(CHANNELS)
        .map(|px| luminance(px[0], px[1], px[2]))
        .collect();
    // Buffer geometry is validated on construction, so the shape always fits
    Array2::from_shape_vec((h, w), values).unwrap_or_else(|_| Array2::zeros((h, w)))
}

/// Sobel gradient `(gx, gy)` at `(x, y)` of `luma`
///
/// Returns `None` unless `(x, y)` has a full 3x3 neighbourhood, i.e.
/// `1 <= x < width - 1` and `1 <= y < height - 1`.
#[must_use]
pub fn sobel_at(luma: &Array2<f32>, x: usize, y: usize) -> Option<(f32, f32)> {
    let (h, w) = luma.dim();
    if x == 0 || y == 0 || x + 1 >= w || y + 1 >= h {
        return None;
    }

    let mut gx = 0.0;
    let mut gy = 0.0;
    for (dy, (row_x, row_y)) in SOBEL_X.iter().zip(SOBEL_Y.iter()).enumerate() {
        for (dx, (kx, ky)) in row_x.iter().zip(row_y).enumerate() {
            let l = *luma.get([y + dy - 1, x + dx - 1])?;
            gx += kx * l;
            gy += ky * l;
        }
    }
    Some((gx, gy))
}

/// Gradient magnitude `sqrt(gx^2 + gy^2)`
#[inline]
#[must_use]
pub fn magnitude(gx: f32, gy: f32) -> f32 {
    gx.hypot(gy)
}

/// Per-pixel edge flags for one engine run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMap {
    flags: Array2<bool>,
}

impl EdgeMap {
    /// Run the Sobel pass over `buffer` and flag interior pixels whose
    /// gradient magnitude strictly exceeds `threshold`
    #[must_use]
    pub fn compute(buffer: &PixelBuffer, threshold: f32) -> Self {
        let (w, h) = (buffer.width() as usize, buffer.height() as usize);
        let mut flags = Array2::from_elem((h, w), false);

        if w < 3 || h < 3 {
            tracing::trace!(width = w, height = h, "no interior pixels; edge map left empty");
            return Self { flags };
        }

        let luma = luminance_plane(buffer);
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                if let Some((gx, gy)) = sobel_at(&luma, x, y) {
                    flags[[y, x]] = magnitude(gx, gy) > threshold;
                }
            }
        }

        Self { flags }
    }

    /// `(width, height)` of the map
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        let (h, w) = self.flags.dim();
        (w as u32, h as u32)
    }

    /// Whether `(x, y)` is an edge; out-of-range coordinates are not
    #[must_use]
    pub fn is_edge(&self, x: usize, y: usize) -> bool {
        self.flags.get((y, x)).copied().unwrap_or(false)
    }

    /// Whether the pixel with row-major index `index` is an edge
    #[must_use]
    pub fn is_edge_index(&self, index: usize) -> bool {
        self.flags
            .as_slice()
            .and_then(|s| s.get(index))
            .copied()
            .unwrap_or(false)
    }

    /// Number of pixels flagged as edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.flags.iter().filter(|&&e| e).count()
    }

    /// Render the map as a grayscale image (255 on edges) for inspection
    #[must_use]
    pub fn to_image(&self) -> GrayImage {
        let (w, h) = self.dimensions();
        GrayImage::from_fn(w, h, |x, y| {
            image::Luma([if self.is_edge(x as usize, y as usize) { 255 } else { 0 }])
        })
    }
}
