//! Retrieves the raw CSV bytes from a URL or a local file.

use std::path::Path;

use crate::IngestError;

/// Returns whether `source` should be fetched over HTTP.
#[must_use]
pub fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Downloads or reads the full CSV resource into memory.
///
/// # Errors
///
/// Returns [`IngestError::Http`] if the request fails or the server responds
/// with a non-success status, or [`IngestError::Io`] if the local file
/// cannot be read.
pub async fn fetch_csv(source: &str) -> Result<Vec<u8>, IngestError> {
    if is_remote(source) {
        log::info!("Downloading CSV from {source}");
        let response = reqwest::get(source).await?.error_for_status()?;
        let bytes = response.bytes().await?;
        log::debug!("Downloaded {} bytes from {source}", bytes.len());
        Ok(bytes.to_vec())
    } else {
        log::info!("Reading CSV from {source}");
        let bytes = tokio::fs::read(Path::new(source)).await?;
        log::debug!("Read {} bytes from {source}", bytes.len());
        Ok(bytes)
    }
}
