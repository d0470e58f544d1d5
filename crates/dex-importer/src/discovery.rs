//! Discovery stage (spec §4.6 step 1): finds the newest ChecklistBank base
//! release that has an export ready, by checking the top 5 candidates.
//!
//! Grounded on `col_importer.py::download_data`'s dataset-registry query and
//! per-candidate HEAD check.

use crate::error::{ImporterError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub key: i64,
    pub version: Option<String>,
    pub created: Option<String>,
    pub title: Option<String>,
    pub doi: Option<String>,
    pub size: Option<i64>,
    pub origin: Option<String>,
}

#[derive(Deserialize)]
struct DatasetListResponse {
    result: Vec<DatasetInfo>,
}

const EXPORT_PARAMS: &[(&str, &str)] = &[("format", "ColDP"), ("extended", "true")];

/// Queries the top 5 recent base releases (newest first) and returns the
/// first one whose export archive is already available.
pub async fn find_release(client: &reqwest::Client, api_base: &str) -> Result<DatasetInfo> {
    tracing::info!("querying ChecklistBank for recent base releases");

    let response = client
        .get(format!("{api_base}/dataset"))
        .query(&[
            ("offset", "0"),
            ("limit", "5"),
            ("origin", "release"),
            ("sortBy", "CREATED"),
            ("reverse", "false"),
        ])
        .send()
        .await?
        .error_for_status()?;

    let datasets: DatasetListResponse = response.json().await?;
    if datasets.result.is_empty() {
        return Err(ImporterError::NoReleaseAvailable);
    }

    for dataset in &datasets.result {
        let check_url = format!("{api_base}/dataset/{}/export.zip", dataset.key);
        let check = client.head(&check_url).query(EXPORT_PARAMS).send().await;
        match check {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(key = dataset.key, version = ?dataset.version, "found dataset with available export");
                return Ok(dataset.clone());
            }
            Ok(resp) => {
                tracing::warn!(key = dataset.key, status = %resp.status(), "export not available");
            }
            Err(err) => {
                tracing::warn!(key = dataset.key, error = %err, "failed to check export availability");
            }
        }
    }

    Err(ImporterError::NoReleaseAvailable)
}

pub fn export_url(api_base: &str, dataset_key: i64) -> String {
    format!("{api_base}/dataset/{dataset_key}/export.zip")
}

pub const EXPORT_QUERY: &[(&str, &str)] = EXPORT_PARAMS;
