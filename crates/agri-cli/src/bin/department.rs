//! Ask a running AgriWeb server for a department synthesis.

use agri_cli::{synthesis_summary, write_json, ApiClient};
use clap::Parser;
use std::path::PathBuf;

/// Request a department synthesis from an AgriWeb server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// AgriWeb server URL
    #[arg(long, default_value = "http://localhost:5000")]
    url: String,

    /// Department code, e.g. 19 or 2A
    #[arg(long)]
    code: String,

    /// Minimum parcel area in hectares
    #[arg(long)]
    min_area_ha: Option<f64>,

    /// Maximum distance to a BT substation in meters
    #[arg(long)]
    max_bt_distance_m: Option<f64>,

    /// Skip cadastral plot numbers
    #[arg(long)]
    no_cadastre: bool,

    /// Output file ("-" for stdout)
    #[arg(long, default_value = "-")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut query = Vec::new();
    if let Some(min) = args.min_area_ha {
        query.push(("min_area_ha", min.to_string()));
    }
    if let Some(max) = args.max_bt_distance_m {
        query.push(("max_bt_distance_m", max.to_string()));
    }
    query.push(("enrich_cadastre", (!args.no_cadastre).to_string()));

    eprintln!("Requesting synthesis for department {} from {}...", args.code, args.url);
    let synthesis = ApiClient::new(&args.url)
        .department_synthesis(&args.code, &query)
        .await?;
    eprintln!("{}", synthesis_summary(&synthesis));
    write_json(&args.out, &synthesis)?;
    Ok(())
}
