//! Saturate-and-count primitives shared by the activation engine and the
//! accumulation kernels.
//!
//! Every helper clamps a wide intermediate into a narrower domain and bumps the
//! caller's counter exactly once per clamped value. Lane helpers produce the
//! same counter delta as running the scalar helper on each lane.

#[inline]
fn bump(sat: &mut u32) { *sat = sat.saturating_add(1); }

#[inline]
pub fn saturate_i16(v: i64, sat: &mut u32) -> i16 {
    if v > i16::MAX as i64 {
        bump(sat);
        i16::MAX
    } else if v < i16::MIN as i64 {
        bump(sat);
        i16::MIN
    } else {
        v as i16
    }
}

#[inline]
pub fn saturate_i32(v: i64, sat: &mut u32) -> i32 {
    if v > i32::MAX as i64 {
        bump(sat);
        i32::MAX
    } else if v < i32::MIN as i64 {
        bump(sat);
        i32::MIN
    } else {
        v as i32
    }
}

/// Narrow a full lane array to i16. The clamp mask is computed for all lanes
/// first and the counter is advanced by its population count, matching the
/// way a vector compare + movemask would count.
#[inline]
pub fn saturate_lanes_i16<const LANES: usize>(v: &[i64; LANES], out: &mut [i16], sat: &mut u32) {
    debug_assert!(out.len() >= LANES);
    let mut mask = 0u32;
    for (lane, (&x, o)) in v.iter().zip(out.iter_mut()).enumerate() {
        let clamped = x.clamp(i16::MIN as i64, i16::MAX as i64);
        if clamped != x { mask |= 1 << lane; }
        *o = clamped as i16;
    }
    *sat = sat.saturating_add(mask.count_ones());
}

/// Sum per-worker partial counters into one total.
pub fn merge_counts<I: IntoIterator<Item = u32>>(partials: I) -> u32 {
    partials.into_iter().fold(0u32, |acc, c| acc.saturating_add(c))
}
