use log::{debug, trace};

use super::binary::BinarySearchTable;
use super::lookup::{Geometry, LookupTable, PWL_SIZE_ALGORITHM_THRESHOLD};
use super::segment::{SegmentTable, TableId};
use super::Evaluator;
use crate::error::{PwlError, Result};

/// How the builder picks the evaluator variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// Lookup table when the geometry allows it, binary search otherwise.
    #[default]
    Auto,
    /// Lookup table regardless of table size; fails if the geometry does not fit.
    ForceLookup,
    ForceBinary,
}

/// Resolve a segment table into an evaluator without caching.
pub fn build_evaluator(table: &SegmentTable, strategy: Strategy) -> Result<Evaluator> {
    let segments = table.segments();
    if segments.is_empty() { return Err(PwlError::EmptySegmentTable); }
    let evaluator = match strategy {
        Strategy::ForceBinary => Evaluator::Binary(BinarySearchTable::build(segments)),
        Strategy::ForceLookup => {
            let geometry = Geometry::analyze(segments).map_err(|reason| PwlError::LookupUnavailable { reason })?;
            Evaluator::Lookup(LookupTable::build(segments, geometry))
        }
        Strategy::Auto if segments.len() <= PWL_SIZE_ALGORITHM_THRESHOLD => {
            Evaluator::Binary(BinarySearchTable::build(segments))
        }
        Strategy::Auto => match Geometry::analyze(segments) {
            Ok(geometry) => Evaluator::Lookup(LookupTable::build(segments, geometry)),
            Err(reason) => {
                debug!("pwl table {:?}: lookup rejected ({}), using binary search", table.id(), reason);
                Evaluator::Binary(BinarySearchTable::build(segments))
            }
        },
    };
    match &evaluator {
        Evaluator::Lookup(t) => debug!(
            "pwl table {:?}: lookup, {} segments, {} buckets of 2^{}",
            table.id(), segments.len(), t.bucket_count, t.bucket_width_log2
        ),
        Evaluator::Binary(t) => debug!("pwl table {:?}: binary search over {} segments", table.id(), t.segments.len()),
    }
    Ok(evaluator)
}

/// Builds evaluators lazily and keeps the last one until the table id or the
/// strategy changes. Rebuilding needs `&mut self`, so no reader can observe a
/// half-built cache.
#[derive(Debug, Default)]
pub struct CacheBuilder {
    strategy: Strategy,
    cached: Option<(TableId, Strategy, Evaluator)>,
    builds: u64,
}

impl CacheBuilder {
    pub fn new(strategy: Strategy) -> Self { Self { strategy, cached: None, builds: 0 } }

    pub fn strategy(&self) -> Strategy { self.strategy }

    pub fn set_strategy(&mut self, strategy: Strategy) { self.strategy = strategy; }

    /// Number of evaluators constructed so far (cache misses).
    pub fn builds(&self) -> u64 { self.builds }

    pub fn build(&mut self, table: &SegmentTable) -> Result<&Evaluator> {
        let hit = matches!(&self.cached, Some((id, strategy, _)) if *id == table.id() && *strategy == self.strategy);
        if hit {
            trace!("pwl table {:?}: cache hit", table.id());
            return self.cached().ok_or(PwlError::EmptySegmentTable);
        }
        // a failed build must not leave the stale evaluator behind
        self.cached = None;
        let evaluator = build_evaluator(table, self.strategy)?;
        self.builds += 1;
        let (_, _, evaluator) = self.cached.insert((table.id(), self.strategy, evaluator));
        Ok(&*evaluator)
    }

    /// Last built evaluator, if any.
    pub fn cached(&self) -> Option<&Evaluator> { self.cached.as_ref().map(|(_, _, e)| e) }

    pub fn invalidate(&mut self) { self.cached = None; }
}
