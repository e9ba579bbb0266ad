//! Range download handler.

use crate::api::AppState;
use crate::downloader::RunEvent;
use crate::error::{Error, Result};
use crate::stream::{NDJSON_CONTENT_TYPE, ndjson_stream_from};
use crate::types::{DownloadRequest, PartialDownloadRequest};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// POST /api/download - Download a range of resources, streaming progress
///
/// The body is optional; omitted fields take the configured defaults. Headers are
/// only committed once the first item has been processed, so a fault on the very
/// first write is still answered with a plain error response.
#[utoipa::path(
    post,
    path = "/api/download",
    tag = "downloads",
    request_body(
        content = PartialDownloadRequest,
        description = "Range to download; every field is optional",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "One JSON line per identifier, then a summary line", content_type = "application/x-ndjson", body = crate::types::ProgressRecord),
        (status = 400, description = "Invalid request (e.g. start greater than end)", body = crate::error::ApiError),
        (status = 500, description = "Storage area could not be created or written", body = crate::error::ApiError)
    )
)]
pub async fn start_download(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let partial = parse_request_body(&body)?;
    let request = DownloadRequest::from_partial(partial, &state.config.defaults);

    let mut run = state.downloader.start(request).await?;

    let first = match run.next_event().await {
        Some(RunEvent::Failed(e)) => return Err(e),
        other => other,
    };

    tracing::debug!(
        start = request.start,
        end = request.end,
        delay_ms = request.delay_ms,
        "streaming range download"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(ndjson_stream_from(first, run)),
    )
        .into_response())
}

/// Decode an optional JSON body; an empty body means "all defaults"
fn parse_request_body(body: &[u8]) -> Result<PartialDownloadRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(PartialDownloadRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| Error::validation("body", format!("invalid request body: {}", e)))
}
