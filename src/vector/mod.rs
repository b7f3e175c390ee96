//! Hypervector kernel: allocation, generation, and the eight primitive verbs.
//!
//! A [`Hypervector`] is a fixed-length, element-typed numeric vector. All
//! arithmetic is carried internally in `f64` and clamped back to the
//! configured [`NumericType`](crate::config::NumericType) on write, matching
//! the teacher's quantize/dequantize pattern for integer-backed vectors.

pub mod numeric;
pub mod ops;
pub mod rng;
pub mod space;

pub use rng::Mulberry32;
pub use space::{Hypervector, VectorSpace};
