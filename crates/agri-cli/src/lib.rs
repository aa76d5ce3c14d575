//! AgriWeb CLI - command line tools around the report service.
//!
//! Binaries:
//! - commune_report: build one report in-process and save it as JSON
//! - synthesize: merge saved reports into a ranked synthesis
//! - department: ask a running server for a department synthesis

pub mod client;
pub mod files;

pub use client::ApiClient;
pub use files::{load_reports, write_json};

use agri_core::{CommuneReport, DepartmentSynthesis, LayerKind};

/// One-line summary printed after a report build.
pub fn report_summary(report: &CommuneReport) -> String {
    let place = report
        .commune
        .as_ref()
        .map(|c| c.name.clone())
        .or_else(|| report.location.address.clone())
        .unwrap_or_else(|| format!("({:.5}, {:.5})", report.location.lat, report.location.lon));
    let failed = report.risks.failed_categories().len();
    format!(
        "{}: {} RPG parcels, {} BT / {} HTA substations nearby, {} risk records{}",
        place,
        report.features(LayerKind::Rpg).len(),
        report.nearest_bt.len(),
        report.nearest_hta.len(),
        report.risks.total_count(),
        if failed > 0 {
            format!(" ({failed} risk categories unavailable)")
        } else {
            String::new()
        }
    )
}

pub fn synthesis_summary(synthesis: &DepartmentSynthesis) -> String {
    format!(
        "{} reports ({} with parcels): {} parcels, {} distinct, {} establishments, top {} kept",
        synthesis.generated_from,
        synthesis.communes_with_parcels,
        synthesis.total_parcels,
        synthesis.distinct_parcels,
        synthesis.distinct_establishments,
        synthesis.top_parcels.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use agri_core::{CommuneInfo, Location};

    #[test]
    fn summary_prefers_commune_name() {
        let mut report = CommuneReport::new(Location::new(45.2658, 1.7708).unwrap());
        assert!(report_summary(&report).starts_with("(45.26580, 1.77080)"));

        report.commune = Some(CommuneInfo {
            name: "Tulle".to_string(),
            insee_code: Some("19272".to_string()),
            population: None,
            surface_ha: None,
            centre: None,
            contour: None,
        });
        report
            .risks
            .record(agri_core::RiskCategory::Radon, Err("HTTP 503".to_string()));
        let summary = report_summary(&report);
        assert!(summary.starts_with("Tulle: 0 RPG parcels"));
        assert!(summary.ends_with("(1 risk categories unavailable)"));
    }
}
