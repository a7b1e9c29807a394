use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use qpwl::pwl::{evaluate_tile, CacheBuilder, Strategy, Tile};
use qpwl::KernelConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "qpwl", version, about = "Resolve a PWL segment table and evaluate sample inputs")]
struct Args {
    /// JSON segment list ([{"x_base":..,"slope":..,"y_base":..}, ...])
    #[arg(long)]
    segments: PathBuf,

    /// Comma-separated i32 pre-activation values
    #[arg(long, allow_hyphen_values = true, default_value = "")]
    inputs: String,

    /// Evaluator selection: auto, lookup or binary
    #[arg(long, default_value = "auto")]
    strategy: String,

    /// Optional JSON kernel config (accumulation / vector width)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_strategy(s: &str) -> Result<Strategy> {
    match s.to_lowercase().as_str() {
        "auto" => Ok(Strategy::Auto),
        "lookup" => Ok(Strategy::ForceLookup),
        "binary" => Ok(Strategy::ForceBinary),
        _ => bail!("invalid strategy '{}': use auto, lookup or binary", s),
    }
}

fn parse_inputs(s: &str) -> Result<Vec<i32>> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<i32>().with_context(|| format!("bad input value '{}'", t)))
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let table = qpwl::io::load_segments(&args.segments)?;
    let config = match args.config.as_deref() {
        Some(p) => qpwl::io::load_config(p)?,
        None => KernelConfig::default(),
    };
    info!("kernel config: {:?}", config);

    let mut builder = CacheBuilder::new(parse_strategy(&args.strategy)?);
    let evaluator = builder.build(&table)?;
    match evaluator.as_lookup() {
        Some(t) => println!("variant=lookup segments={} buckets={} width=2^{}", table.len(), t.bucket_count, t.bucket_width_log2),
        None => println!("variant=binary segments={}", table.len()),
    }

    let inputs = parse_inputs(&args.inputs)?;
    if inputs.is_empty() { return Ok(()); }
    let mut outputs = vec![0i16; inputs.len()];
    let mut sat = 0u32;
    evaluate_tile(evaluator, &inputs, Tile::full(1, inputs.len())?, &mut outputs, config.vector, &mut sat)?;
    for (x, y) in inputs.iter().zip(&outputs) { println!("{} -> {}", x, y); }
    println!("saturations={}", sat);
    Ok(())
}
