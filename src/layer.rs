use log::debug;

use crate::config::{KernelConfig, VectorWidth};
use crate::error::{PwlError, Result};
use crate::kernels::{affine, AffineWeights};
use crate::pwl::{evaluate_tile, CacheBuilder, Evaluator, Segment, SegmentTable, Strategy, Tile};
use crate::saturate::saturate_i16;

/// Activation stage that owns its segment table and the evaluator built from
/// it. The evaluator is built on first use and reused until the table changes.
#[derive(Debug)]
pub struct ActivationLayer {
    table: SegmentTable,
    cache: CacheBuilder,
}

impl ActivationLayer {
    pub fn new(table: SegmentTable, strategy: Strategy) -> Self { Self { table, cache: CacheBuilder::new(strategy) } }

    pub fn from_segments(segments: Vec<Segment>) -> Result<Self> {
        Ok(Self::new(SegmentTable::new(segments)?, Strategy::Auto))
    }

    pub fn table(&self) -> &SegmentTable { &self.table }

    /// Replace the activation function; the next forward pass rebuilds.
    pub fn set_segments(&mut self, segments: Vec<Segment>) -> Result<()> {
        self.table.replace(segments)?;
        debug!("activation table replaced, new id {:?}", self.table.id());
        Ok(())
    }

    pub fn set_strategy(&mut self, strategy: Strategy) { self.cache.set_strategy(strategy); }

    pub fn evaluator(&mut self) -> Result<&Evaluator> { self.cache.build(&self.table) }

    /// Evaluators built so far by this layer.
    pub fn builds(&self) -> u64 { self.cache.builds() }

    pub fn forward(&mut self, input: &[i32], tile: Tile, output: &mut [i16], width: VectorWidth, sat: &mut u32) -> Result<()> {
        let evaluator = self.cache.build(&self.table)?;
        evaluate_tile(evaluator, input, tile, output, width, sat)
    }
}

/// Fully connected layer with an optional piecewise-linear activation.
/// Without activation the i32 sums are narrowed to i16 directly.
#[derive(Debug)]
pub struct AffineLayer {
    config: KernelConfig,
    weights: AffineWeights,
    activation: Option<ActivationLayer>,
    batch: usize,
    scratch: Vec<i32>,
}

impl AffineLayer {
    pub fn new(config: KernelConfig, weights: AffineWeights, activation: Option<ActivationLayer>, batch: usize) -> Self {
        let scratch = vec![0i32; weights.outputs() * batch];
        Self { config, weights, activation, batch, scratch }
    }

    pub fn config(&self) -> KernelConfig { self.config }

    pub fn set_config(&mut self, config: KernelConfig) { self.config = config; }

    pub fn activation_mut(&mut self) -> Option<&mut ActivationLayer> { self.activation.as_mut() }

    /// Output length: `outputs x batch`, one row per neuron.
    pub fn output_len(&self) -> usize { self.scratch.len() }

    pub fn forward(&mut self, input: &[i16], output: &mut [i16], sat: &mut u32) -> Result<()> {
        affine(self.config, &self.weights, input, self.batch, &mut self.scratch, sat)?;
        let tile = Tile::full(self.weights.outputs(), self.batch)?;
        match &mut self.activation {
            Some(act) => act.forward(&self.scratch, tile, output, self.config.vector, sat),
            None => {
                if output.len() < self.scratch.len() {
                    return Err(PwlError::BufferTooSmall { needed: self.scratch.len(), actual: output.len() });
                }
                for (o, &acc) in output.iter_mut().zip(&self.scratch) { *o = saturate_i16(acc as i64, sat); }
                Ok(())
            }
        }
    }
}
