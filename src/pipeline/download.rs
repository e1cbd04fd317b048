//! Video download stage
//!
//! Fetches the submitted video reference into the job's working directory.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use url::Url;

/// Downloads source videos over HTTP(S)
#[derive(Clone, Default)]
pub struct VideoDownloader {
    client: Client,
}

impl VideoDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch `link` into `dest`, returning the written path
    pub async fn download(&self, link: &str, dest: &Path) -> Result<PathBuf> {
        let url = Url::parse(link).with_context(|| format!("invalid video link: {}", link))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("unsupported video link scheme: {}", url.scheme()));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch video: {}", link))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("video fetch returned status {}: {}", status, link));
        }

        let bytes = response
            .bytes()
            .await
            .context("failed to read video response body")?;
        tokio::fs::write(dest, &bytes)
            .await
            .with_context(|| format!("failed to write video to {}", dest.display()))?;

        tracing::debug!("downloaded {} bytes to {}", bytes.len(), dest.display());
        Ok(dest.to_path_buf())
    }
}
