//! Archive and storage listing handlers.

use super::FileListResponse;
use crate::api::AppState;
use crate::error::Result;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// GET /api/zip - Download every stored file as one ZIP archive
#[utoipa::path(
    get,
    path = "/api/zip",
    tag = "archive",
    responses(
        (status = 200, description = "ZIP archive of the storage area", content_type = "application/zip"),
        (status = 404, description = "No storage area or no JSON files to archive", body = crate::error::ApiError),
        (status = 500, description = "Archive could not be built", body = crate::error::ApiError)
    )
)]
pub async fn download_archive(State(state): State<AppState>) -> Result<Response> {
    let bytes = state.downloader.build_archive().await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        state.config.storage.archive_name
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// GET /api/files - List stored files
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "archive",
    responses(
        (status = 200, description = "Eligible files currently in the storage area", body = FileListResponse),
        (status = 500, description = "Storage area could not be read", body = crate::error::ApiError)
    )
)]
pub async fn list_files(State(state): State<AppState>) -> Result<Json<FileListResponse>> {
    let files = state.downloader.stored_files().await?;

    Ok(Json(FileListResponse {
        count: files.len(),
        files,
        download_path: state.config.storage.public_path.clone(),
    }))
}
