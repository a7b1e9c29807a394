//! Piecewise-linear activation engine.
//!
//! A [`SegmentTable`] is resolved once by the [`CacheBuilder`] into an
//! [`Evaluator`], either a bucketed lookup table or a binary search over the
//! breakpoints, and then evaluated per sample or per tile.

pub mod binary;
pub mod builder;
pub mod lookup;
pub mod segment;
pub mod tile;

pub use binary::BinarySearchTable;
pub use builder::{build_evaluator, CacheBuilder, Strategy};
pub use lookup::{LookupEntry, LookupTable, PWL_LOOKUP_COUNT, PWL_SIZE_ALGORITHM_THRESHOLD};
pub use segment::{Segment, SegmentTable, TableId};
pub use tile::{evaluate_tile, evaluate_tile_par, Tile};

/// Resolved evaluator; exactly one variant per build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluator {
    Lookup(LookupTable),
    Binary(BinarySearchTable),
}

impl Evaluator {
    /// Evaluate one pre-activation value, clamping to i16 and counting clamps.
    #[inline]
    pub fn evaluate(&self, x: i32, sat: &mut u32) -> i16 {
        match self {
            Evaluator::Lookup(t) => t.evaluate(x, sat),
            Evaluator::Binary(t) => t.evaluate(x, sat),
        }
    }

    pub fn is_lookup(&self) -> bool { matches!(self, Evaluator::Lookup(_)) }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Evaluator::Lookup(_) => "lookup",
            Evaluator::Binary(_) => "binary",
        }
    }

    pub fn as_lookup(&self) -> Option<&LookupTable> {
        match self {
            Evaluator::Lookup(t) => Some(t),
            Evaluator::Binary(_) => None,
        }
    }

    pub fn as_binary(&self) -> Option<&BinarySearchTable> {
        match self {
            Evaluator::Binary(t) => Some(t),
            Evaluator::Lookup(_) => None,
        }
    }
}

/// Unclamped evaluation shared by the lane loops in [`tile`].
pub(crate) trait WideEval {
    fn evaluate_wide(&self, x: i32) -> i64;
}

impl WideEval for LookupTable {
    #[inline]
    fn evaluate_wide(&self, x: i32) -> i64 { LookupTable::evaluate_wide(self, x) }
}

impl WideEval for BinarySearchTable {
    #[inline]
    fn evaluate_wide(&self, x: i32) -> i64 { BinarySearchTable::evaluate_wide(self, x) }
}
