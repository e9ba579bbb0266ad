//! # ipfs-dl
//!
//! Sequential range downloader for numbered JSON resources behind an IPFS gateway.
//!
//! Given an inclusive range of identifiers, each `"{id}.json"` is fetched from the
//! configured gateway one at a time, written verbatim into a local storage area,
//! and reported as one progress record. Records are streamed as newline-delimited
//! JSON so a client can render progress as it happens. The storage area can be
//! exported as a single ZIP archive.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ipfs_dl::{Config, DownloadRequest, RangeDownloader, RunEvent};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = Arc::new(RangeDownloader::new(Config::default())?);
//!
//!     let mut run = downloader.start(DownloadRequest::new(0, 9, 100)).await?;
//!     while let Some(event) = run.next_event().await {
//!         match event {
//!             RunEvent::Progress(record) => println!("{} {}%", record.file_name, record.progress),
//!             RunEvent::Complete(summary) => println!("{}", summary.message),
//!             RunEvent::Failed(e) => return Err(e.into()),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// ZIP export of the storage area
pub mod archive;
/// Configuration types
pub mod config;
/// Range orchestration and run handles
pub mod downloader;
/// Error types
pub mod error;
/// Gateway fetching
pub mod fetcher;
/// NDJSON encoding and decoding of run records
pub mod stream;
/// Core types and records
pub mod types;

// Re-export commonly used types
pub use archive::ArchiveBuilder;
pub use config::Config;
pub use downloader::{DownloadRun, RangeDownloader, RunEnd, RunEvent};
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use fetcher::{HttpFetcher, ResourceFetcher};
pub use stream::{DownloadTally, RecordDecoder};
pub use types::{
    DownloadRequest, FetchOutcome, ItemStatus, PartialDownloadRequest, ProgressRecord,
    ResourceId, StreamRecord, SummaryRecord,
};

/// Resolve once the process is asked to terminate.
///
/// On Unix this is SIGTERM or SIGINT. A signal whose handler cannot be registered
/// is ignored, and if neither can be, Ctrl+C via `tokio::signal::ctrl_c()` is
/// awaited instead. Elsewhere only Ctrl+C is awaited.
///
/// Used as the graceful shutdown trigger of [`api::start_api_server`], and by the
/// CLI to cancel a foreground run.
pub async fn shutdown_signal() {
    let name = wait_for_signal().await;
    tracing::info!(signal = name, "shutdown requested");
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    // Registration can fail in restricted environments such as some containers
    let register = |kind: SignalKind, name: &str| match signal(kind) {
        Ok(stream) => Some(stream),
        Err(e) => {
            tracing::warn!(error = %e, signal = name, "could not register signal handler");
            None
        }
    };

    async fn recv(stream: Option<&mut Signal>) {
        match stream {
            Some(stream) => {
                stream.recv().await;
            }
            None => std::future::pending().await,
        }
    }

    let mut sigterm = register(SignalKind::terminate(), "SIGTERM");
    let mut sigint = register(SignalKind::interrupt(), "SIGINT");

    if sigterm.is_none() && sigint.is_none() {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
        return "ctrl_c";
    }

    tokio::select! {
        _ = recv(sigterm.as_mut()) => "SIGTERM",
        _ = recv(sigint.as_mut()) => "SIGINT",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
    }
    "ctrl_c"
}
