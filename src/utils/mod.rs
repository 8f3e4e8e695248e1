//! Shared utilities for the segmentation engine and its collaborators

pub mod validation;

pub use validation::{BufferValidator, NumericValidator};
