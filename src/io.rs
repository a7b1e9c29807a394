use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::config::KernelConfig;
use crate::pwl::{Segment, SegmentTable};

/// Load a JSON segment list: `[{"x_base": .., "slope": .., "y_base": ..}, ...]`.
pub fn load_segments<P: AsRef<Path>>(path: P) -> Result<SegmentTable> {
    let f = File::open(&path).with_context(|| format!("open segment file: {}", path.as_ref().display()))?;
    let segments: Vec<Segment> = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse segment file: {}", path.as_ref().display()))?;
    SegmentTable::new(segments).with_context(|| format!("invalid segment table: {}", path.as_ref().display()))
}

pub fn parse_segments(json: &str) -> Result<SegmentTable> {
    let segments: Vec<Segment> = serde_json::from_str(json).context("parse segment list")?;
    Ok(SegmentTable::new(segments)?)
}

/// Load a [`KernelConfig`]; missing fields take their defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<KernelConfig> {
    let f = File::open(&path).with_context(|| format!("open kernel config: {}", path.as_ref().display()))?;
    serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parse kernel config: {}", path.as_ref().display()))
}

pub fn save_segments<P: AsRef<Path>>(path: P, table: &SegmentTable) -> Result<()> {
    let f = File::create(&path).with_context(|| format!("create segment file: {}", path.as_ref().display()))?;
    serde_json::to_writer_pretty(f, table.segments()).context("write segment list")?;
    Ok(())
}
