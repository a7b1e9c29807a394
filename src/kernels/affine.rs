use crate::config::{AccumulationWidth, KernelConfig, VectorWidth};
use crate::error::{PwlError, Result};
use crate::saturate::saturate_i32;

/// Inputs summed between two intermediate saturation checks in exact mode.
/// Every vector width divides it, so block boundaries never depend on width.
pub const PARTIAL_SUM_BLOCK: usize = 8;

/// Fully connected layer parameters: `weights` is `outputs x inputs`
/// row-major, one i32 bias per output.
#[derive(Debug, Clone)]
pub struct AffineWeights {
    inputs: usize,
    outputs: usize,
    weights: Vec<i16>,
    bias: Vec<i32>,
}

impl AffineWeights {
    pub fn new(inputs: usize, outputs: usize, weights: Vec<i16>, bias: Vec<i32>) -> Result<Self> {
        if weights.len() != inputs * outputs {
            return Err(PwlError::ShapeMismatch { what: "weights", expected: inputs * outputs, actual: weights.len() });
        }
        if bias.len() != outputs {
            return Err(PwlError::ShapeMismatch { what: "bias", expected: outputs, actual: bias.len() });
        }
        Ok(Self { inputs, outputs, weights, bias })
    }

    pub fn inputs(&self) -> usize { self.inputs }

    pub fn outputs(&self) -> usize { self.outputs }

    #[inline]
    fn row(&self, o: usize) -> &[i16] { &self.weights[o * self.inputs..(o + 1) * self.inputs] }
}

/// `output[o * batch + b] = bias[o] + sum_i weights[o][i] * input[b][i]`.
///
/// `input` holds `batch` row-major vectors of `inputs` elements. The output is
/// `outputs x batch`, one row per neuron, which is the layout the activation
/// tile consumes. In exact mode every intermediate and final clamp to i32 is
/// counted; fast mode stays in wrapping i32 and leaves the checked narrowing to
/// the store into the activation domain.
pub fn affine(
    config: KernelConfig,
    weights: &AffineWeights,
    input: &[i16],
    batch: usize,
    output: &mut [i32],
    sat: &mut u32,
) -> Result<()> {
    let n = weights.inputs;
    if input.len() != batch * n {
        return Err(PwlError::ShapeMismatch { what: "input", expected: batch * n, actual: input.len() });
    }
    let needed = weights.outputs * batch;
    if output.len() < needed {
        return Err(PwlError::BufferTooSmall { needed, actual: output.len() });
    }
    for o in 0..weights.outputs {
        let row = weights.row(o);
        let bias = weights.bias[o];
        for b in 0..batch {
            let x = &input[b * n..(b + 1) * n];
            output[o * batch + b] = match config.accumulation {
                // bias seeds the wrapping accumulator: exact whenever the full sum fits i32
                AccumulationWidth::Fast32 => bias.wrapping_add(dot_fast(config.vector, row, x)),
                AccumulationWidth::Exact64 => {
                    let sum = dot_exact(config.vector, row, x, sat);
                    saturate_i32(bias as i64 + sum, sat)
                }
            };
        }
    }
    Ok(())
}

/// Wrapping i32 dot product with no intermediate checks.
pub fn dot_fast(width: VectorWidth, w: &[i16], x: &[i16]) -> i32 {
    match width {
        VectorWidth::Scalar => dot_fast_lanes::<1>(w, x),
        VectorWidth::Width128 => dot_fast_lanes::<4>(w, x),
        VectorWidth::Width256 => dot_fast_lanes::<8>(w, x),
    }
}

/// i64 dot product saturated to the i32 domain after every
/// [`PARTIAL_SUM_BLOCK`] inputs, counting each intermediate clamp.
pub fn dot_exact(width: VectorWidth, w: &[i16], x: &[i16], sat: &mut u32) -> i64 {
    let mut acc = 0i64;
    for (wb, xb) in w.chunks(PARTIAL_SUM_BLOCK).zip(x.chunks(PARTIAL_SUM_BLOCK)) {
        acc += match width {
            VectorWidth::Scalar => block_sum_lanes::<1>(wb, xb),
            VectorWidth::Width128 => block_sum_lanes::<4>(wb, xb),
            VectorWidth::Width256 => block_sum_lanes::<8>(wb, xb),
        };
        acc = saturate_i32(acc, sat) as i64;
    }
    acc
}

#[inline]
fn dot_fast_lanes<const LANES: usize>(w: &[i16], x: &[i16]) -> i32 {
    debug_assert_eq!(w.len(), x.len());
    let mut lanes = [0i32; LANES];
    let mut wc = w.chunks_exact(LANES);
    let mut xc = x.chunks_exact(LANES);
    for (wv, xv) in (&mut wc).zip(&mut xc) {
        for l in 0..LANES { lanes[l] = lanes[l].wrapping_add(wv[l] as i32 * xv[l] as i32); }
    }
    let mut acc = lanes.iter().fold(0i32, |a, &v| a.wrapping_add(v));
    for (&a, &b) in wc.remainder().iter().zip(xc.remainder()) { acc = acc.wrapping_add(a as i32 * b as i32); }
    acc
}

#[inline]
fn block_sum_lanes<const LANES: usize>(w: &[i16], x: &[i16]) -> i64 {
    let mut lanes = [0i64; LANES];
    let mut wc = w.chunks_exact(LANES);
    let mut xc = x.chunks_exact(LANES);
    for (wv, xv) in (&mut wc).zip(&mut xc) {
        for l in 0..LANES { lanes[l] += wv[l] as i64 * xv[l] as i64; }
    }
    let mut acc: i64 = lanes.iter().sum();
    for (&a, &b) in wc.remainder().iter().zip(xc.remainder()) { acc += a as i64 * b as i64; }
    acc
}
