// Fixed-point piecewise-linear activation engine with saturating kernels
pub mod config;
pub mod error;
pub mod io;
pub mod kernels;
pub mod layer;
pub mod pwl;
pub mod saturate;

// Re-exports for the common path: build once, evaluate many
pub use config::{AccumulationWidth, KernelConfig, VectorWidth};
pub use error::PwlError;
pub use pwl::{evaluate_tile, CacheBuilder, Evaluator, Segment, SegmentTable, Strategy, Tile};
