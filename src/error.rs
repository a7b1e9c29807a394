use thiserror::Error;

/// Configuration errors raised while building caches or validating tiles.
/// Numeric saturation is never reported here; it is clamped and counted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PwlError {
    #[error("segment table is empty")]
    EmptySegmentTable,

    #[error("breakpoint {current} at segment {index} is below previous breakpoint {previous}")]
    NonMonotonicBreakpoints { index: usize, previous: i32, current: i32 },

    #[error("lookup table cannot be built: {reason}")]
    LookupUnavailable { reason: &'static str },

    #[error("empty {axis} range")]
    EmptyRange { axis: &'static str },

    #[error("column range ends at {col_last} but row stride is {stride}")]
    RangeOutOfBounds { col_last: usize, stride: usize },

    #[error("tile ending at row {row_last} with stride {stride} exceeds the addressable range")]
    TileTooLarge { row_last: usize, stride: usize },

    #[error("buffer too small: need {needed} elements, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("{what}: expected {expected} elements, got {actual}")]
    ShapeMismatch { what: &'static str, expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, PwlError>;
