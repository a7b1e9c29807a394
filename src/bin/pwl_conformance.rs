use anyhow::{bail, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use qpwl::pwl::{build_evaluator, evaluate_tile, evaluate_tile_par, Evaluator, Segment, SegmentTable, Strategy, Tile};
use qpwl::saturate::merge_counts;
use qpwl::VectorWidth;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "pwl-conformance", version, about = "Randomized lookup/binary and vector-width conformance sweep")]
struct Args {
    /// Number of random segment tables
    #[arg(long, default_value_t = 500)]
    tables: u64,

    /// Base RNG seed; table i uses seed + i
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,

    /// Random inputs per table in addition to the boundary inputs
    #[arg(long, default_value_t = 256)]
    samples: usize,

    /// Threads (0 = rayon default)
    #[arg(long, default_value_t = 0)]
    threads: usize,
}

struct TableReport {
    lookup_checked: bool,
    saturations: u32,
    mismatches: Vec<String>,
}

fn random_table(rng: &mut SmallRng) -> Vec<Segment> {
    let n = rng.gen_range(4..=48usize);
    let width_log2 = rng.gen_range(2..=12u32);
    let mut x: i64 = rng.gen_range(-200_000i64..=0) & !3;
    let mut out = Vec::with_capacity(n);
    let first = if rng.gen_bool(0.5) { i32::MIN } else { (x - 4096) as i32 };
    out.push(Segment::with_scale(first, rng.gen_range(0..=3), rng.gen(), rng.gen()));
    for _ in 1..n {
        out.push(Segment::with_scale(x as i32, rng.gen_range(0..=3), rng.gen(), rng.gen()));
        // mostly whole multiples of the width, sometimes an irregular gap
        let gap = if rng.gen_bool(0.8) {
            (rng.gen_range(1..=3i64)) << width_log2
        } else {
            rng.gen_range(1..=4i64 << width_log2) & !3
        };
        x += gap.max(4);
    }
    out
}

fn sample_inputs(rng: &mut SmallRng, segments: &[Segment], lookup: Option<&Evaluator>, extra: usize) -> Vec<i32> {
    let mut out = vec![i32::MIN, i32::MIN + 1, -1, 0, 1, i32::MAX];
    for s in segments {
        let b = s.breakpoint();
        for d in [-4, -1, 0, 1, 2, 4] { out.push(b.saturating_add(d)); }
    }
    if let Some(t) = lookup.and_then(Evaluator::as_lookup) {
        let origin = segments[1].breakpoint() as i64;
        for j in 0..=t.bucket_count as i64 {
            let edge = origin + (j << t.bucket_width_log2);
            for d in [-1i64, 0, 1] { out.push((edge + d).clamp(i32::MIN as i64, i32::MAX as i64) as i32); }
        }
    }
    for _ in 0..extra { out.push(rng.gen()); }
    out
}

fn check_table(seed: u64, extra: usize) -> TableReport {
    let mut rng = SmallRng::seed_from_u64(seed);
    let segments = random_table(&mut rng);
    let mut report = TableReport { lookup_checked: false, saturations: 0, mismatches: Vec::new() };
    let table = match SegmentTable::new(segments.clone()) {
        Ok(t) => t,
        Err(e) => {
            report.mismatches.push(format!("seed {}: generator produced invalid table: {}", seed, e));
            return report;
        }
    };
    let Ok(binary) = build_evaluator(&table, Strategy::ForceBinary) else {
        report.mismatches.push(format!("seed {}: binary build failed", seed));
        return report;
    };
    let lookup = build_evaluator(&table, Strategy::ForceLookup).ok();
    let xs = sample_inputs(&mut rng, &segments, lookup.as_ref(), extra);

    if let Some(lookup) = &lookup {
        report.lookup_checked = true;
        for &x in &xs {
            let (mut sb, mut sl) = (0u32, 0u32);
            let yb = binary.evaluate(x, &mut sb);
            let yl = lookup.evaluate(x, &mut sl);
            if yb != yl || sb != sl {
                report.mismatches.push(format!("seed {}: x={} binary={}/{} lookup={}/{}", seed, x, yb, sb, yl, sl));
            }
        }
    }

    // tile results must not depend on vector width or parallelism
    let cols = 13usize;
    let rows = xs.len() / cols;
    if rows == 0 { return report; }
    let tile = match Tile::full(rows, cols) {
        Ok(t) => t,
        Err(e) => {
            report.mismatches.push(format!("seed {}: {}", seed, e));
            return report;
        }
    };
    let input = &xs[..rows * cols];
    let mut reference = vec![0i16; input.len()];
    let mut ref_sat = 0u32;
    for (y, &x) in reference.iter_mut().zip(input) { *y = binary.evaluate(x, &mut ref_sat); }
    report.saturations = ref_sat;
    for evaluator in std::iter::once(&binary).chain(lookup.as_ref()) {
        for width in VectorWidth::ALL {
            for parallel in [false, true] {
                let mut out = vec![0i16; input.len()];
                let mut sat = 0u32;
                let res = if parallel {
                    evaluate_tile_par(evaluator, input, tile, &mut out, width, &mut sat)
                } else {
                    evaluate_tile(evaluator, input, tile, &mut out, width, &mut sat)
                };
                if let Err(e) = res {
                    report.mismatches.push(format!("seed {}: tile error {}", seed, e));
                } else if out != reference || sat != ref_sat {
                    report.mismatches.push(format!(
                        "seed {}: {} tile {:?} parallel={} diverged (sat {} vs {})",
                        seed, evaluator.variant_name(), width, parallel, sat, ref_sat
                    ));
                }
            }
        }
    }
    report
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new().num_threads(args.threads).build_global()?;
    }

    let pb = ProgressBar::new(args.tables);
    pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} tables [{elapsed_precise}]")?);
    let reports: Vec<TableReport> = (0..args.tables)
        .into_par_iter()
        .map(|i| {
            let r = check_table(args.seed.wrapping_add(i), args.samples);
            pb.inc(1);
            r
        })
        .collect();
    pb.finish();

    let lookup_tables = reports.iter().filter(|r| r.lookup_checked).count();
    let saturations = merge_counts(reports.iter().map(|r| r.saturations));
    let mismatches: Vec<&String> = reports.iter().flat_map(|r| r.mismatches.iter()).collect();
    info!("{} tables, {} with a lookup variant, {} saturations in reference tiles", reports.len(), lookup_tables, saturations);
    println!("tables={} lookup_checked={} saturations={} mismatches={}", reports.len(), lookup_tables, saturations, mismatches.len());
    for m in mismatches.iter().take(20) { warn!("{}", m); println!("{}", m); }
    if !mismatches.is_empty() { bail!("{} conformance mismatches", mismatches.len()); }
    Ok(())
}
