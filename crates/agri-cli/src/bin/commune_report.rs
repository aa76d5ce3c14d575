//! Build one report in-process against the configured upstreams.
//!
//! Upstream URLs and layer names come from the same AGRI_* environment
//! variables as the server.

use agri_cli::{report_summary, write_json};
use agri_core::{NetworkKind, ReportFilters};
use agri_server::commune::{ReportBuilder, ReportTarget};
use agri_server::config::Config;
use agri_server::http::HttpClient;
use agri_server::map::{report_overlays, MapRenderer};
use clap::Parser;
use std::path::PathBuf;

/// Build an AgriWeb report for a point, an address or a commune
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Latitude (with --lon)
    #[arg(long, requires = "lon")]
    lat: Option<f64>,

    /// Longitude (with --lat)
    #[arg(long, requires = "lat")]
    lon: Option<f64>,

    /// Postal address to geocode
    #[arg(long, conflicts_with_all = ["lat", "commune"])]
    address: Option<String>,

    /// Commune name
    #[arg(long, conflicts_with = "lat")]
    commune: Option<String>,

    /// Minimum parcel area in hectares
    #[arg(long)]
    min_area_ha: Option<f64>,

    /// Maximum parcel area in hectares
    #[arg(long)]
    max_area_ha: Option<f64>,

    /// Crop label or code substring
    #[arg(long)]
    culture: Option<String>,

    /// Maximum distance to a BT substation in meters
    #[arg(long)]
    max_bt_distance_m: Option<f64>,

    /// Maximum distance to an HTA substation in meters
    #[arg(long)]
    max_hta_distance_m: Option<f64>,

    /// Networks the distance limits apply to (BT, HTA)
    #[arg(long, value_delimiter = ',')]
    networks: Vec<NetworkKind>,

    /// Skip the livestock establishment layer
    #[arg(long)]
    no_livestock: bool,

    /// Also render a Leaflet map into AGRI_MAP_DIR
    #[arg(long)]
    map: bool,

    /// Output file ("-" for stdout)
    #[arg(long, default_value = "-")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("agri_server=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let target = match (args.lat, args.lon, &args.address, &args.commune) {
        (Some(lat), Some(lon), _, _) => ReportTarget::Point { lat, lon },
        (_, _, Some(address), _) => ReportTarget::Address(address.clone()),
        (_, _, _, Some(commune)) => ReportTarget::Commune(commune.clone()),
        _ => anyhow::bail!("one of --lat/--lon, --address or --commune is required"),
    };
    let filters = ReportFilters {
        min_area_ha: args.min_area_ha,
        max_area_ha: args.max_area_ha,
        culture: args.culture.clone(),
        max_bt_distance_m: args.max_bt_distance_m,
        max_hta_distance_m: args.max_hta_distance_m,
        networks: args.networks.clone(),
        include_livestock: !args.no_livestock,
        ..ReportFilters::default()
    };

    let config = Config::from_env();
    let builder = ReportBuilder::new(HttpClient::new(&config)?, &config);
    let mut report = builder.build(target, &filters).await?;

    if args.map {
        let title = report
            .commune
            .as_ref()
            .map(|c| c.name.clone())
            .or_else(|| report.location.address.clone())
            .unwrap_or_else(|| "point".to_string());
        let artifact = MapRenderer::new(&config)
            .render(&report.location, &title, &report_overlays(&report))
            .await?;
        eprintln!("Map written to {}", config.map_dir.join(&artifact.file_name).display());
        report.map_path = Some(artifact.relative_path);
    }

    eprintln!("{}", report_summary(&report));
    write_json(&args.out, &report)?;
    Ok(())
}
