//! Range downloader: sequential fetching of a numbered range of resources.
//!
//! The `RangeDownloader` struct and its methods are organized by concern:
//! - [`run`] - The per-range loop, progress computation and the spawned run handle
//!
//! Fetches within one range never overlap. Progress is tied to the position in
//! the range and the configured delay throttles load against the gateway, so the
//! loop must stay sequential even though the runtime could do more.

mod run;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use run::{DownloadRun, RunEnd, RunEvent};

use crate::archive;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{HttpFetcher, ResourceFetcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct RangeDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Transport used for each identifier (trait object so tests can substitute it)
    pub(crate) fetcher: Arc<dyn ResourceFetcher>,
}

impl RangeDownloader {
    /// Create a downloader that fetches from the configured gateway over HTTP
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(&config.gateway)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Create a downloader with an injected fetcher
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
        }
    }

    /// Current configuration
    pub fn get_config(&self) -> Arc<Config> {
        self.config.clone()
    }

    /// Directory accumulating fetched files
    pub fn storage_dir(&self) -> &Path {
        self.config.download_dir()
    }

    /// Local path a resource is stored at
    pub fn destination_for(&self, file_name: &str) -> PathBuf {
        self.storage_dir().join(file_name)
    }

    /// Create the storage area if it does not exist yet
    pub async fn prepare_storage(&self) -> Result<()> {
        let dir = self.storage_dir();
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            tracing::error!(path = %dir.display(), error = %e, "cannot create storage area");
            Error::storage(dir, e)
        })
    }

    /// Names of the eligible files currently in the storage area, sorted
    ///
    /// An absent storage area yields an empty list.
    pub async fn stored_files(&self) -> Result<Vec<String>> {
        let dir = self.storage_dir().to_path_buf();
        let files = tokio::task::spawn_blocking(move || archive::eligible_files(&dir))
            .await
            .map_err(|e| Error::Other(format!("file listing task failed: {}", e)))??;

        Ok(files
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect())
    }

    /// Bundle the storage area into a ZIP archive
    pub async fn build_archive(&self) -> Result<Vec<u8>> {
        archive::ArchiveBuilder::new(self.storage_dir())
            .build_async()
            .await
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
