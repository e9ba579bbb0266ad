//! Application state for the API server

use crate::{Config, RangeDownloader};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The downloader every handler works through
    pub downloader: Arc<RangeDownloader>,

    /// Configuration (request defaults, archive name)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<RangeDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
