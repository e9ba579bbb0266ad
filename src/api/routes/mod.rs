//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`] - Range downloads streamed as NDJSON
//! - [`archive`] - ZIP bundle and listing of the storage area
//! - [`system`] - Health and OpenAPI

use serde::{Deserialize, Serialize};

mod archive;
mod downloads;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use archive::*;
pub use downloads::*;
pub use system::*;

// ============================================================================
// Response Types (shared across handlers)
// ============================================================================

/// Response for GET /api/files
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    /// Eligible file names in the storage area, sorted
    pub files: Vec<String>,
    /// Number of files listed
    pub count: usize,
    /// Public path the files are served under
    pub download_path: String,
}

/// Response for GET /api/health
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Always "ok" while the server is answering
    pub status: String,
    /// Crate version
    pub version: String,
}
