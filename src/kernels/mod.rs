//! Reference accumulation kernels feeding the activation stage.

pub mod affine;

pub use affine::{affine, dot_exact, dot_fast, AffineWeights, PARTIAL_SUM_BLOCK};
