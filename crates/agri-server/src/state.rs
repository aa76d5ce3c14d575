//! Shared application state.

use crate::commune::ReportBuilder;
use crate::config::Config;
use crate::department::DepartmentBuilder;
use crate::http::HttpClient;
use crate::map::MapRenderer;

/// Process-wide state: configuration plus the upstream clients. Nothing here
/// is request-scoped; the geocode cache is the only mutable part.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Config,
    pub reports: ReportBuilder,
    pub departments: DepartmentBuilder,
    pub maps: MapRenderer,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let http = HttpClient::new(&config)?;
        let reports = ReportBuilder::new(http.clone(), &config);
        let departments = DepartmentBuilder::new(reports.clone(), http, &config);
        let maps = MapRenderer::new(&config);
        Ok(Self {
            config,
            reports,
            departments,
            maps,
        })
    }
}
