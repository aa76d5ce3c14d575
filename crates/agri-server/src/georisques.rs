//! National risk registry fan-out.

use crate::config::Config;
use crate::http::HttpClient;
use agri_core::{RiskBundle, RiskCategory};
use futures::future::join_all;

#[derive(Debug, Clone)]
pub struct RiskAggregator {
    http: HttpClient,
    base_url: String,
}

impl RiskAggregator {
    pub fn new(http: HttpClient, config: &Config) -> Self {
        Self {
            http,
            base_url: config.georisques_url.clone(),
        }
    }

    /// Query all 14 categories concurrently. A failing category leaves an
    /// empty list and an error marker; the others are unaffected.
    pub async fn aggregate(&self, lat: f64, lon: f64) -> RiskBundle {
        let calls = RiskCategory::ALL.into_iter().map(|category| async move {
            (category, self.fetch_category(category, lat, lon).await)
        });
        let outcomes = join_all(calls).await;

        let mut bundle = RiskBundle::new();
        for (category, outcome) in outcomes {
            if let Err(err) = &outcome {
                tracing::warn!("Risk category {:?} failed: {}", category, err);
            }
            bundle.record(category, outcome);
        }
        tracing::debug!(
            "Risk bundle: {} records, {} failed categories",
            bundle.total_count(),
            bundle.failed_categories().len()
        );
        bundle
    }

    async fn fetch_category(
        &self,
        category: RiskCategory,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<agri_core::Feature>, String> {
        let url = format!("{}/{}", self.base_url, category.endpoint());
        let mut query = vec![("latlon", format!("{lon},{lat}"))];
        if let Some(radius) = category.radius_m() {
            query.push(("rayon", radius.to_string()));
        }

        match self.http.get_json(&url, &query).await {
            Ok(body) => category.parse_records(&body),
            Err(err) if err.is_not_found() && category.not_found_means_empty() => Ok(Vec::new()),
            Err(err) => Err(err.to_string()),
        }
    }
}
