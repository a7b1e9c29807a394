//! Bucketed lookup evaluator.
//!
//! The domain right of the second breakpoint is cut into `bucket_count`
//! buckets of width `2^bucket_width_log2`, never wider than the smallest
//! breakpoint gap, so a bucket holds at most one breakpoint and therefore at
//! most two segments. Each bucket entry packs those two as halves A and B.
//!
//! Construction addresses halves by sub-slot: sub-slot `2j` is half A of
//! bucket `j`, sub-slot `2j + 1` is half B (even -> A, odd -> B). A segment
//! whose breakpoint sits exactly on a bucket edge starts at that bucket's A
//! slot, otherwise at its B slot, and it owns every sub-slot up to where the
//! next segment starts. Half A therefore always holds the segment active at the
//! bucket's left edge and half B the one active at its right edge.
//!
//! Evaluation subtracts B's breakpoint first; a negative result means the
//! input lies left of B's breakpoint and the differential A offset moves the
//! relative value onto segment A.

use super::segment::{Segment, X_BASE_MASK};
use crate::saturate::saturate_i16;

/// Table sizes at or below this always use binary search.
pub const PWL_SIZE_ALGORITHM_THRESHOLD: usize = 3;
/// Largest bucket count a lookup table may use.
pub const PWL_LOOKUP_COUNT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LookupEntry {
    /// `B.x_base - A.x_base` in relative units, added after the B offset.
    pub x_base_a: i64,
    pub slope_a: i16,
    pub shift_a: u32,
    pub y_base_a: i16,
    /// Negated breakpoint of B relative to the second breakpoint.
    pub x_base_b: i64,
    pub slope_b: i16,
    pub shift_b: u32,
    pub y_base_b: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub bucket_width_log2: u32,
    pub bucket_count: usize,
}

impl Geometry {
    /// Bucket layout for `segments`, or the reason none fits the budget.
    pub fn analyze(segments: &[Segment]) -> Result<Self, &'static str> {
        if segments.len() < 3 { return Err("fewer than two segments right of the left boundary"); }
        let mut width_raw = i64::MAX;
        for pair in segments[1..].windows(2) {
            let gap = pair[1].breakpoint() as i64 - pair[0].breakpoint() as i64;
            if gap > 0 && gap < width_raw { width_raw = gap; }
        }
        if width_raw == i64::MAX { return Err("no positive gap between breakpoints"); }
        let bucket_width_log2 = 63 - width_raw.leading_zeros();
        let width = 1i64 << bucket_width_log2;
        let span = segments[segments.len() - 1].breakpoint() as i64 - segments[1].breakpoint() as i64;
        let bucket_count = ((span + width - 1) / width + 1) as usize;
        if bucket_count > PWL_LOOKUP_COUNT { return Err("bucket count exceeds the lookup budget"); }
        Ok(Self { bucket_width_log2, bucket_count })
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Half {
    neg_x_base: i64,
    slope: i16,
    shift: u32,
    y_base: i16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    pub bucket_width_log2: u32,
    pub bucket_count: usize,
    // fast path: left boundary (unmasked x_base) and the span before the first bucket
    pub x_base0: i32,
    pub y_base0: i16,
    pub slope0: i16,
    pub shift0: u32,
    /// `b[0] - b[1]`: turns `x - b[0]` into the bucketed coordinate `x - b[1]`.
    pub x_base1_diff: i64,
    pub entries: Vec<LookupEntry>,
}

impl LookupTable {
    pub fn build(segments: &[Segment], geometry: Geometry) -> Self {
        let Geometry { bucket_width_log2, bucket_count } = geometry;
        let origin = segments[1].breakpoint() as i64;
        let edge_mask = (1i64 << bucket_width_log2) - 1;
        let slot_count = 2 * bucket_count;
        let first_slot = |relative: i64| -> usize {
            let bucket = (relative >> bucket_width_log2) as usize;
            if relative & edge_mask == 0 { 2 * bucket } else { 2 * bucket + 1 }
        };

        let mut halves = vec![Half::default(); slot_count];
        for k in 1..segments.len() {
            let s = &segments[k];
            let relative = s.breakpoint() as i64 - origin;
            let from = first_slot(relative);
            // the last segment also covers every trailing slot
            let to = match segments.get(k + 1) {
                Some(next) => first_slot(next.breakpoint() as i64 - origin),
                None => slot_count,
            };
            let half = Half { neg_x_base: -relative, slope: s.slope, shift: s.shift(), y_base: s.y_base };
            for slot in &mut halves[from..to] { *slot = half; }
        }

        let entries = halves
            .chunks_exact(2)
            .map(|pair| {
                let (a, b) = (pair[0], pair[1]);
                LookupEntry {
                    x_base_a: a.neg_x_base - b.neg_x_base,
                    slope_a: a.slope,
                    shift_a: a.shift,
                    y_base_a: a.y_base,
                    x_base_b: b.neg_x_base,
                    slope_b: b.slope,
                    shift_b: b.shift,
                    y_base_b: b.y_base,
                }
            })
            .collect();

        let s0 = &segments[0];
        Self {
            bucket_width_log2,
            bucket_count,
            x_base0: s0.x_base,
            y_base0: s0.y_base,
            slope0: s0.slope,
            shift0: s0.shift(),
            x_base1_diff: s0.breakpoint() as i64 - origin,
            entries,
        }
    }

    #[inline]
    pub fn evaluate(&self, x: i32, sat: &mut u32) -> i16 {
        saturate_i16(self.evaluate_wide(x), sat)
    }

    /// Unclamped value; the flat left region yields `y_base0`.
    #[inline]
    pub(crate) fn evaluate_wide(&self, x: i32) -> i64 {
        if x <= self.x_base0 { return self.y_base0 as i64; }
        let relative = x as i64 - (self.x_base0 & X_BASE_MASK) as i64;
        let bucketed = relative + self.x_base1_diff;
        if bucketed < 0 {
            return ((relative * self.slope0 as i64) >> self.shift0) + self.y_base0 as i64;
        }
        let index = ((bucketed >> self.bucket_width_log2) as usize).min(self.bucket_count - 1);
        let e = &self.entries[index];
        let sub = bucketed + e.x_base_b;
        if sub >= 0 {
            ((sub * e.slope_b as i64) >> e.shift_b) + e.y_base_b as i64
        } else {
            let sub = sub + e.x_base_a;
            ((sub * e.slope_a as i64) >> e.shift_a) + e.y_base_a as i64
        }
    }
}
