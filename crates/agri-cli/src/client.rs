//! HTTP client for a running AgriWeb server.

use agri_core::DepartmentSynthesis;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body["error"].as_str().unwrap_or("no error message");
            anyhow::bail!("{} failed with {}: {}", path, status, message);
        }
        Ok(response.json().await?)
    }

    /// Build and synthesize a whole department server-side.
    pub async fn department_synthesis(
        &self,
        code: &str,
        filters: &[(&str, String)],
    ) -> Result<DepartmentSynthesis> {
        self.get(&format!("/v1/departments/{}/synthesis", code.trim()), filters)
            .await
    }
}
