use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{PwlError, Result};

/// Low bits of `x_base` carry the slope scale code, not the breakpoint.
pub const X_BASE_MASK: i32 = !0b11;

/// One linear piece in the packed fixed-point form the accelerator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub x_base: i32,
    pub slope: i16,
    pub y_base: i16,
}

impl Segment {
    pub fn new(x_base: i32, slope: i16, y_base: i16) -> Self { Self { x_base, slope, y_base } }

    /// Segment whose breakpoint is `x` with the given 2-bit scale code.
    pub fn with_scale(x: i32, scale_code: u8, slope: i16, y_base: i16) -> Self {
        Self { x_base: (x & X_BASE_MASK) | (scale_code & 0b11) as i32, slope, y_base }
    }

    #[inline]
    pub fn breakpoint(&self) -> i32 { self.x_base & X_BASE_MASK }

    #[inline]
    pub fn scale_code(&self) -> u8 { (self.x_base & 0b11) as u8 }

    /// Right shift applied to `relative * slope`.
    #[inline]
    pub fn shift(&self) -> u32 { self.scale_code() as u32 * 8 }
}

/// Identity of one segment table revision. Caches compare ids instead of
/// addresses; a fresh id is issued on construction and on every replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(u64);

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

impl TableId {
    fn fresh() -> Self { TableId(NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed)) }

    pub fn get(self) -> u64 { self.0 }
}

/// Validated, read-only list of segments ordered by breakpoint.
/// Clones share the id because they share the content.
#[derive(Debug, Clone)]
pub struct SegmentTable {
    id: TableId,
    segments: Vec<Segment>,
}

impl SegmentTable {
    pub fn new(segments: Vec<Segment>) -> Result<Self> {
        validate(&segments)?;
        Ok(Self { id: TableId::fresh(), segments })
    }

    pub fn id(&self) -> TableId { self.id }

    pub fn segments(&self) -> &[Segment] { &self.segments }

    pub fn len(&self) -> usize { self.segments.len() }

    pub fn is_empty(&self) -> bool { self.segments.is_empty() }

    /// Swap in new content. On error the table is left untouched.
    pub fn replace(&mut self, segments: Vec<Segment>) -> Result<()> {
        validate(&segments)?;
        self.segments = segments;
        self.id = TableId::fresh();
        Ok(())
    }
}

fn validate(segments: &[Segment]) -> Result<()> {
    if segments.is_empty() { return Err(PwlError::EmptySegmentTable); }
    for (i, pair) in segments.windows(2).enumerate() {
        let previous = pair[0].breakpoint();
        let current = pair[1].breakpoint();
        // Equal breakpoints are tolerated; the later segment shadows the earlier one.
        if current < previous {
            return Err(PwlError::NonMonotonicBreakpoints { index: i + 1, previous, current });
        }
    }
    Ok(())
}
