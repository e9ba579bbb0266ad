//! OpenAPI documentation and schema generation
//!
//! Describes the ipfs-dl REST API using utoipa for compile-time document generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the ipfs-dl REST API
///
/// The document can be accessed via:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ipfs-dl REST API",
        version = "0.1.0",
        description = "Sequential range downloads from an IPFS gateway with NDJSON progress streaming and ZIP export",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::start_download,

        // Archive
        crate::api::routes::download_archive,
        crate::api::routes::list_files,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::ResourceId,
        crate::types::PartialDownloadRequest,
        crate::types::DownloadRequest,
        crate::types::ItemStatus,
        crate::types::ProgressRecord,
        crate::types::SummaryRecord,

        // Config types from config.rs
        crate::config::Config,
        crate::config::GatewayConfig,
        crate::config::StorageConfig,
        crate::config::RangeDefaults,
        crate::config::ApiConfig,
        crate::config::ServerIntegrationConfig,

        // API response types from routes
        crate::api::routes::FileListResponse,
        crate::api::routes::HealthResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Range downloads - Fetch numbered resources and stream per-item progress"),
        (name = "archive", description = "Archive - Bundle or list the files accumulated in the storage area"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
