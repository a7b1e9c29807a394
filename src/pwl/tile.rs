use rayon::prelude::*;
use std::ops::{Range, RangeInclusive};

use super::{Evaluator, WideEval};
use crate::config::VectorWidth;
use crate::error::{PwlError, Result};
use crate::saturate::{saturate_i16, saturate_lanes_i16};

/// Rectangular region `[row_first..=row_last] x [col_first..=col_last]` of a
/// row-major matrix whose rows are `stride` elements apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub row_first: usize,
    pub row_last: usize,
    pub col_first: usize,
    pub col_last: usize,
    pub stride: usize,
}

impl Tile {
    pub fn new(rows: RangeInclusive<usize>, cols: RangeInclusive<usize>, stride: usize) -> Result<Self> {
        let (row_first, row_last) = rows.into_inner();
        let (col_first, col_last) = cols.into_inner();
        let tile = Self { row_first, row_last, col_first, col_last, stride };
        tile.validate()?;
        Ok(tile)
    }

    /// Fields are public, so evaluation re-runs this before indexing.
    fn validate(&self) -> Result<()> {
        if self.row_first > self.row_last { return Err(PwlError::EmptyRange { axis: "row" }); }
        if self.col_first > self.col_last { return Err(PwlError::EmptyRange { axis: "column" }); }
        if self.col_last >= self.stride {
            return Err(PwlError::RangeOutOfBounds { col_last: self.col_last, stride: self.stride });
        }
        if self.checked_required_len().is_none() {
            return Err(PwlError::TileTooLarge { row_last: self.row_last, stride: self.stride });
        }
        Ok(())
    }

    // col_last < stride, so the sum never exceeds (row_last + 1) * stride
    fn checked_required_len(&self) -> Option<usize> {
        self.row_last.checked_mul(self.stride)?.checked_add(self.col_last + 1)
    }

    /// Whole `rows x cols` matrix.
    pub fn full(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 { return Err(PwlError::EmptyRange { axis: "row" }); }
        if cols == 0 { return Err(PwlError::EmptyRange { axis: "column" }); }
        Self::new(0..=rows - 1, 0..=cols - 1, cols)
    }

    pub fn rows(&self) -> usize { self.row_last - self.row_first + 1 }

    pub fn cols(&self) -> usize { self.col_last - self.col_first + 1 }

    pub fn elements(&self) -> usize { self.rows() * self.cols() }

    /// Smallest buffer length that contains the whole region; `usize::MAX`
    /// when that length is not addressable.
    pub fn required_len(&self) -> usize { self.checked_required_len().unwrap_or(usize::MAX) }

    /// Flat index range of the region's slice of `row`.
    #[inline]
    pub fn row_span(&self, row: usize) -> Range<usize> {
        let start = row * self.stride;
        start + self.col_first..start + self.col_last + 1
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (self.row_first..=self.row_last).flat_map(move |row| self.row_span(row))
    }

    pub(crate) fn check(&self, input_len: usize, output_len: usize) -> Result<()> {
        self.validate()?;
        let needed = self.required_len();
        if input_len < needed { return Err(PwlError::BufferTooSmall { needed, actual: input_len }); }
        if output_len < needed { return Err(PwlError::BufferTooSmall { needed, actual: output_len }); }
        Ok(())
    }
}

/// Evaluate every element of `tile`, writing each result at the same flat
/// index of `output`. Elements outside the region are left untouched.
pub fn evaluate_tile(
    evaluator: &Evaluator,
    input: &[i32],
    tile: Tile,
    output: &mut [i16],
    width: VectorWidth,
    sat: &mut u32,
) -> Result<()> {
    tile.check(input.len(), output.len())?;
    for row in tile.row_first..=tile.row_last {
        let span = tile.row_span(row);
        evaluate_row(evaluator, &input[span.clone()], &mut output[span], width, sat);
    }
    Ok(())
}

/// Row-parallel variant; each worker counts into its own partial counter and
/// the partials are summed into `sat` afterwards.
pub fn evaluate_tile_par(
    evaluator: &Evaluator,
    input: &[i32],
    tile: Tile,
    output: &mut [i16],
    width: VectorWidth,
    sat: &mut u32,
) -> Result<()> {
    tile.check(input.len(), output.len())?;
    let total = output
        .par_chunks_mut(tile.stride)
        .enumerate()
        .skip(tile.row_first)
        .take(tile.rows())
        .map(|(row, out_row)| {
            let mut local = 0u32;
            let span = tile.row_span(row);
            evaluate_row(evaluator, &input[span], &mut out_row[tile.col_first..=tile.col_last], width, &mut local);
            local
        })
        .reduce(|| 0, |a, b| a.saturating_add(b));
    *sat = sat.saturating_add(total);
    Ok(())
}

pub(crate) fn evaluate_row(evaluator: &Evaluator, input: &[i32], output: &mut [i16], width: VectorWidth, sat: &mut u32) {
    match evaluator {
        Evaluator::Lookup(t) => evaluate_row_with(t, input, output, width, sat),
        Evaluator::Binary(t) => evaluate_row_with(t, input, output, width, sat),
    }
}

fn evaluate_row_with<E: WideEval>(eval: &E, input: &[i32], output: &mut [i16], width: VectorWidth, sat: &mut u32) {
    match width {
        VectorWidth::Scalar => evaluate_lanes::<E, 1>(eval, input, output, sat),
        VectorWidth::Width128 => evaluate_lanes::<E, 4>(eval, input, output, sat),
        VectorWidth::Width256 => evaluate_lanes::<E, 8>(eval, input, output, sat),
    }
}

#[inline]
fn evaluate_lanes<E: WideEval, const LANES: usize>(eval: &E, input: &[i32], output: &mut [i16], sat: &mut u32) {
    debug_assert_eq!(input.len(), output.len());
    let mut in_chunks = input.chunks_exact(LANES);
    let mut out_chunks = output.chunks_exact_mut(LANES);
    for (x, y) in (&mut in_chunks).zip(&mut out_chunks) {
        let mut wide = [0i64; LANES];
        for (w, &v) in wide.iter_mut().zip(x) { *w = eval.evaluate_wide(v); }
        saturate_lanes_i16(&wide, y, sat);
    }
    // tail narrower than one vector
    for (&x, y) in in_chunks.remainder().iter().zip(out_chunks.into_remainder()) {
        *y = saturate_i16(eval.evaluate_wide(x), sat);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_rejects_bad_ranges() {
        assert_eq!(Tile::new(2..=1, 0..=3, 4), Err(PwlError::EmptyRange { axis: "row" }));
        assert_eq!(Tile::new(0..=1, 3..=2, 4), Err(PwlError::EmptyRange { axis: "column" }));
        assert_eq!(Tile::new(0..=1, 0..=4, 4), Err(PwlError::RangeOutOfBounds { col_last: 4, stride: 4 }));
        assert_eq!(Tile::full(0, 3), Err(PwlError::EmptyRange { axis: "row" }));
    }

    #[test]
    fn tile_geometry() {
        let t = Tile::new(1..=2, 2..=4, 6).unwrap();
        assert_eq!((t.rows(), t.cols(), t.elements()), (2, 3, 6));
        assert_eq!(t.required_len(), 17);
        assert_eq!(t.row_span(2), 14..17);
        assert_eq!(t.indices().collect::<Vec<_>>(), vec![8, 9, 10, 14, 15, 16]);
        assert_eq!(t.check(17, 16), Err(PwlError::BufferTooSmall { needed: 17, actual: 16 }));
    }

    #[test]
    fn oversized_tiles_are_errors_not_overflows() {
        let half = usize::MAX / 2;
        assert_eq!(Tile::new(0..=half, 0..=3, 4), Err(PwlError::TileTooLarge { row_last: half, stride: 4 }));
        assert_eq!(Tile::new(0..=usize::MAX, 0..=0, 1), Err(PwlError::TileTooLarge { row_last: usize::MAX, stride: 1 }));
        // largest addressable region is still accepted
        let t = Tile::new(0..=usize::MAX - 1, 0..=0, 1).unwrap();
        assert_eq!(t.required_len(), usize::MAX);

        let raw = Tile { row_first: 1, row_last: usize::MAX, col_first: 0, col_last: 1, stride: 2 };
        assert_eq!(raw.required_len(), usize::MAX);
        assert_eq!(raw.check(8, 8), Err(PwlError::TileTooLarge { row_last: usize::MAX, stride: 2 }));
        let inverted = Tile { row_first: 3, row_last: 1, col_first: 0, col_last: 0, stride: 1 };
        assert_eq!(inverted.check(8, 8), Err(PwlError::EmptyRange { axis: "row" }));
    }
}
