//! Consolidated validation utilities
//!
//! Geometry and numeric checks shared by the pixel buffer constructors,
//! the engine entry points and the decoding collaborator.

pub mod buffer;
pub mod numeric;

pub use buffer::BufferValidator;
pub use numeric::NumericValidator;
