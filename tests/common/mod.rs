#![allow(dead_code)]

use qpwl::pwl::Segment;
use rand::rngs::SmallRng;
use rand::Rng;

/// Straightforward oracle: linear scan for the last segment starting at or
/// before `x`. Returns the clamped value and whether it was clamped. The flat
/// left region runs up to the first packed `x_base`, scale bits included.
pub fn reference_eval(segments: &[Segment], x: i32) -> (i16, bool) {
    if x <= segments[0].x_base { return (segments[0].y_base, false); }
    let k = segments.iter().rposition(|s| s.breakpoint() <= x).unwrap();
    let s = segments[k];
    let v = (((x as i64 - s.breakpoint() as i64) * s.slope as i64) >> s.shift()) + s.y_base as i64;
    let c = v.clamp(i16::MIN as i64, i16::MAX as i64);
    (c as i16, c != v)
}

/// Random ascending table, mostly power-of-two friendly spacing so that a
/// lookup build usually fits.
pub fn random_segments(rng: &mut SmallRng, n: usize) -> Vec<Segment> {
    let width_log2 = rng.gen_range(2..=10u32);
    let mut x: i64 = rng.gen_range(-100_000i64..=100_000) & !3;
    let mut out = Vec::with_capacity(n);
    let first = if rng.gen_bool(0.5) { i32::MIN } else { (x - rng.gen_range(4..=8192i64)) as i32 };
    out.push(Segment::with_scale(first, rng.gen_range(0..=3), rng.gen_range(-64..=64), rng.gen()));
    for _ in 1..n {
        out.push(Segment::with_scale(x as i32, rng.gen_range(0..=3), rng.gen(), rng.gen()));
        let gap = if rng.gen_bool(0.75) {
            rng.gen_range(1..=3i64) << width_log2
        } else {
            (rng.gen_range(1..=(4i64 << width_log2)) & !3).max(4)
        };
        x += gap;
    }
    out
}

/// Breakpoints with neighbours, extremes and a few random values.
pub fn sample_points(rng: &mut SmallRng, segments: &[Segment]) -> Vec<i32> {
    let mut out = vec![i32::MIN, i32::MIN + 1, -1, 0, 1, i32::MAX - 1, i32::MAX];
    for s in segments {
        let b = s.breakpoint();
        for d in [-5, -4, -1, 0, 1, 3, 4, 5] { out.push(b.saturating_add(d)); }
    }
    for _ in 0..64 { out.push(rng.gen()); }
    out
}
