use super::segment::Segment;
use crate::saturate::saturate_i16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinarySegment {
    /// Negated breakpoint, so `x + neg_x_base >= 0` reads as `x >= breakpoint`.
    pub neg_x_base: i64,
    pub slope: i16,
    pub shift: u32,
    pub y_base: i16,
}

/// O(log N) evaluator over the negated breakpoint array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinarySearchTable {
    /// First segment's packed `x_base`, scale bits included: the flat region
    /// ends there, not at the masked breakpoint.
    pub x_base0: i32,
    pub y_base0: i16,
    pub segments: Vec<BinarySegment>,
}

impl BinarySearchTable {
    pub fn build(segments: &[Segment]) -> Self {
        debug_assert!(!segments.is_empty());
        let table = segments
            .iter()
            .map(|s| BinarySegment {
                neg_x_base: -(s.breakpoint() as i64),
                slope: s.slope,
                shift: s.shift(),
                y_base: s.y_base,
            })
            .collect();
        Self { x_base0: segments[0].x_base, y_base0: segments[0].y_base, segments: table }
    }

    #[inline]
    pub fn evaluate(&self, x: i32, sat: &mut u32) -> i16 {
        saturate_i16(self.evaluate_wide(x), sat)
    }

    /// Unclamped value. The flat left region yields `y_base0`, which is always
    /// in range, so it never reaches the saturation counter.
    #[inline]
    pub(crate) fn evaluate_wide(&self, x: i32) -> i64 {
        if x <= self.x_base0 { return self.y_base0 as i64; }
        let x = x as i64;
        let s = &self.segments[self.locate(x)];
        (((x + s.neg_x_base) * s.slope as i64) >> s.shift) + s.y_base as i64
    }

    /// Highest `k` with `x + neg_x_base[k] >= 0`. Index 0 always qualifies
    /// once the left boundary has been excluded.
    #[inline]
    fn locate(&self, x: i64) -> usize {
        let mut lo = 0usize;
        let mut hi = self.segments.len();
        // invariant: segments[lo] qualifies, segments[hi..] do not
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if x + self.segments[mid].neg_x_base >= 0 { lo = mid; } else { hi = mid; }
        }
        lo
    }
}
