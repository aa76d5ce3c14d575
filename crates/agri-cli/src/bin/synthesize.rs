//! Merge saved commune reports into a ranked synthesis, offline.

use agri_cli::{load_reports, synthesis_summary, write_json};
use agri_core::{synthesize, DEFAULT_TOP_N};
use clap::Parser;
use std::path::PathBuf;

/// Synthesize saved AgriWeb reports (files or directories of *.json)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Report files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Number of parcels to keep
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,

    /// Output file ("-" for stdout)
    #[arg(long, default_value = "-")]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let reports = load_reports(&args.inputs)?;
    let synthesis = synthesize(&reports, args.top_n);
    eprintln!("{}", synthesis_summary(&synthesis));
    write_json(&args.out, &synthesis)?;
    Ok(())
}
