//! Shared test helpers for creating RangeDownloader instances in tests.

use crate::config::Config;
use crate::downloader::RangeDownloader;
use crate::error::{Error, Result};
use crate::fetcher::ResourceFetcher;
use crate::types::FetchOutcome;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::tempdir;

/// Helper to create a test RangeDownloader pointed at `gateway_url`, storing into a tempdir.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader(gateway_url: &str) -> (RangeDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(gateway_url, &temp_dir);
    let downloader = RangeDownloader::new(config).unwrap();
    (downloader, temp_dir)
}

/// Config whose storage area lives inside `temp_dir` (not created yet)
pub(crate) fn test_config(gateway_url: &str, temp_dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.gateway.base_url = gateway_url.to_string();
    config.gateway.timeout = Duration::from_secs(5);
    config.storage.download_dir = temp_dir.path().join("downloads").join("ipfs_json_files");
    config
}

/// What the scripted fetcher does for one resource
#[derive(Clone, Debug)]
pub(crate) enum Scripted {
    /// Write the body and report success
    Body(&'static str),
    /// Report a non-success status
    Status(u16),
    /// Report a transport failure
    Transport(&'static str),
    /// Fail with a storage fault
    StorageFault,
    /// Never complete (until abandoned)
    Hang,
}

/// In-process fetcher following a per-resource script; unscripted resources succeed with "{}"
pub(crate) struct ScriptedFetcher {
    script: HashMap<String, Scripted>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedFetcher {
    pub(crate) fn new(script: impl IntoIterator<Item = (u64, Scripted)>) -> Self {
        Self {
            script: script
                .into_iter()
                .map(|(id, s)| (format!("{}.json", id), s))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Resource names fetched so far, in call order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Instants at which each fetch started
    pub(crate) fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl ResourceFetcher for ScriptedFetcher {
    async fn fetch(&self, resource_name: &str, destination: &Path) -> Result<FetchOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push((resource_name.to_string(), Instant::now()));

        let file_name = resource_name.to_string();
        match self
            .script
            .get(resource_name)
            .cloned()
            .unwrap_or(Scripted::Body("{}"))
        {
            Scripted::Body(body) => {
                tokio::fs::write(destination, body)
                    .await
                    .map_err(|e| Error::storage(destination, e))?;
                Ok(FetchOutcome::Success {
                    file_name,
                    raw_content: body.as_bytes().to_vec(),
                })
            }
            Scripted::Status(status_code) => Ok(FetchOutcome::Rejected {
                file_name,
                status_code,
            }),
            Scripted::Transport(message) => Ok(FetchOutcome::Errored {
                file_name,
                message: message.to_string(),
            }),
            Scripted::StorageFault => Err(Error::storage(
                destination,
                std::io::Error::new(std::io::ErrorKind::StorageFull, "no space left on device"),
            )),
            Scripted::Hang => std::future::pending().await,
        }
    }
}

/// Downloader using a scripted fetcher; returns the fetcher too so calls can be inspected
pub(crate) fn create_scripted_downloader(
    script: impl IntoIterator<Item = (u64, Scripted)>,
) -> (Arc<RangeDownloader>, Arc<ScriptedFetcher>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config("http://127.0.0.1:9/unused", &temp_dir);
    let fetcher = Arc::new(ScriptedFetcher::new(script));
    let downloader = Arc::new(RangeDownloader::with_fetcher(config, fetcher.clone()));
    (downloader, fetcher, temp_dir)
}
