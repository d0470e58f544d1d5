//! Download stage (spec §4.6 step 2): streams the archive to disk, reusing
//! an existing file if its ZIP integrity test passes.
//!
//! Grounded on `col_importer.py::download_data`'s existing-file reuse check
//! and chunked streaming download with progress logging every 50MB.

use crate::discovery::{export_url, EXPORT_QUERY};
use crate::error::Result;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub fn derive_file_path(download_dir: &Path, dataset_key: i64, date_stamp: &str) -> PathBuf {
    download_dir.join(format!("col_{dataset_key}_{date_stamp}.zip"))
}

/// Downloads `dataset_key`'s export to `file_path`, reusing it if it already
/// exists and passes a ZIP integrity test.
pub async fn download_or_reuse(
    client: &reqwest::Client,
    api_base: &str,
    dataset_key: i64,
    file_path: &Path,
) -> Result<u64> {
    if file_path.exists() {
        tracing::info!(path = %file_path.display(), "found existing archive, validating");
        if crate::archive::test_integrity(file_path).is_ok() {
            tracing::info!("existing archive is valid, reusing it");
            return Ok(std::fs::metadata(file_path)?.len());
        }
        tracing::warn!("existing archive is corrupted, re-downloading");
        std::fs::remove_file(file_path)?;
    }

    if let Some(parent) = file_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let url = export_url(api_base, dataset_key);
    tracing::info!(%url, path = %file_path.display(), "downloading dataset");

    let response = client.get(&url).query(EXPORT_QUERY).send().await?.error_for_status()?;
    let total_size = response.content_length().unwrap_or(0);

    let mut file = tokio::fs::File::create(file_path).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let mut last_logged_mb: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        let downloaded_mb = downloaded / (1024 * 1024);
        if downloaded_mb.saturating_sub(last_logged_mb) >= 50 {
            let pct = if total_size > 0 { downloaded as f64 / total_size as f64 * 100.0 } else { 0.0 };
            tracing::info!(downloaded_mb, total_mb = total_size / (1024 * 1024), pct, "download progress");
            last_logged_mb = downloaded_mb;
        }
    }
    file.flush().await?;

    tracing::info!(bytes = downloaded, "download complete");
    Ok(downloaded)
}
