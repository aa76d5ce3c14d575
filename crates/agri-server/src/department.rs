//! Department-wide synthesis: one report per commune, then a ranked reduction.

use crate::cadastre::CadastreClient;
use crate::commune::ReportBuilder;
use crate::config::Config;
use crate::http::{FetchError, HttpClient};
use agri_core::{synthesize, CommuneReport, DepartmentSynthesis, ReportFilters};
use futures::stream::{self, StreamExt};

#[derive(Debug, Clone)]
pub struct DepartmentBuilder {
    reports: ReportBuilder,
    cadastre: CadastreClient,
    concurrency: usize,
    top_n: usize,
}

impl DepartmentBuilder {
    pub fn new(reports: ReportBuilder, http: HttpClient, config: &Config) -> Self {
        Self {
            reports,
            cadastre: CadastreClient::new(http, config),
            concurrency: config.department_concurrency.max(1),
            top_n: config.top_n,
        }
    }

    /// Build a report for every commune of `code` and reduce them.
    ///
    /// Communes without a published centre are skipped. Only the directory
    /// listing can fail; report builds degrade per layer.
    pub async fn build(
        &self,
        code: &str,
        filters: &ReportFilters,
        enrich_cadastre: bool,
    ) -> Result<DepartmentSynthesis, FetchError> {
        let communes = self.reports.directory().department_communes(code).await?;
        tracing::info!(
            "Department {}: building {} commune reports ({} at a time)",
            code,
            communes.len(),
            self.concurrency
        );

        let reports: Vec<CommuneReport> = stream::iter(communes)
            .map(|info| self.reports.build_for_commune(info, filters))
            .buffered(self.concurrency)
            .filter_map(|report| async move { report })
            .collect()
            .await;

        Ok(self.reduce(&reports, enrich_cadastre).await)
    }

    /// Synthesize already-built reports, optionally resolving plot numbers
    /// for the retained parcels.
    pub async fn reduce(&self, reports: &[CommuneReport], enrich_cadastre: bool) -> DepartmentSynthesis {
        let mut synthesis = synthesize(reports, self.top_n);
        if enrich_cadastre {
            self.cadastre.enrich(&mut synthesis.top_parcels).await;
        }
        tracing::info!(
            "Synthesis: {} reports, {} distinct parcels, {} retained",
            synthesis.generated_from,
            synthesis.distinct_parcels,
            synthesis.top_parcels.len()
        );
        synthesis
    }
}
