//! Newline-delimited JSON streaming of run records
//!
//! Each record is one compact JSON object followed by `\n`, so a reader can split
//! the byte stream on newlines and decode records while more are still arriving.
//! The encoder side turns a [`DownloadRun`] into a body stream; the decoder side
//! ([`RecordDecoder`], [`DownloadTally`]) is what a consumer of that stream uses.

use crate::downloader::{DownloadRun, RunEvent};
use crate::error::{ApiError, Result};
use crate::types::{ItemStatus, ProgressRecord, StreamRecord, SummaryRecord};
use axum::body::Bytes;
use futures::Stream;
use serde::Serialize;
use std::convert::Infallible;

/// Content type of a download stream
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Encode one record as a single JSON line
pub fn encode_line<T: Serialize>(record: &T) -> Result<Bytes> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

/// Body stream for a run: progress lines, then the summary line
///
/// If the run fails after streaming started, the last line is an `{"error": ...}`
/// object instead of a summary. If the run task disappears without a terminal
/// event, an error line is appended so the consumer can tell the stream was cut.
pub fn ndjson_stream(
    run: DownloadRun,
) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> + Send + 'static {
    ndjson_stream_from(None, run)
}

/// Like [`ndjson_stream`], re-emitting an event already taken from the run first
pub fn ndjson_stream_from(
    first: Option<RunEvent>,
    run: DownloadRun,
) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> + Send + 'static {
    let state = BodyState {
        pending: first,
        run,
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        let event = match state.pending.take() {
            Some(event) => Some(event),
            None => state.run.next_event().await,
        };

        let line = match event {
            Some(RunEvent::Progress(record)) => encode_line(&record),
            Some(RunEvent::Complete(summary)) => {
                state.finished = true;
                encode_line(&summary)
            }
            Some(RunEvent::Failed(e)) => {
                state.finished = true;
                encode_line(&ApiError::from(e))
            }
            None => {
                state.finished = true;
                tracing::warn!("download run ended without a terminal record");
                encode_line(&ApiError::internal("download ended unexpectedly"))
            }
        };

        let line = line.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to encode stream record");
            Bytes::new()
        });
        Some((Ok(line), state))
    })
}

struct BodyState {
    pending: Option<RunEvent>,
    run: DownloadRun,
    finished: bool,
}

/// Incremental decoder for a download stream
///
/// Bytes may arrive split at arbitrary points; complete lines are decoded as soon
/// as their newline arrives. Blank lines are skipped, and so are lines that do not
/// decode, which are logged and counted in [`RecordDecoder::skipped`].
#[derive(Debug, Default)]
pub struct RecordDecoder {
    buffer: Vec<u8>,
    skipped: u64,
}

/// One decoded line of a download stream
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedLine {
    /// A progress or summary record
    Record(StreamRecord),
    /// A terminal error object
    Error(ApiError),
}

impl RecordDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<DecodedLine> {
        self.buffer.extend_from_slice(chunk);

        let mut decoded = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(record) = self.decode_or_skip(&line[..line.len() - 1]) {
                decoded.push(record);
            }
        }
        decoded
    }

    /// Decode whatever is left once the stream has ended
    pub fn finish(mut self) -> Option<DecodedLine> {
        let rest = std::mem::take(&mut self.buffer);
        self.decode_or_skip(&rest)
    }

    /// Lines dropped because they did not decode
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn decode_or_skip(&mut self, line: &[u8]) -> Option<DecodedLine> {
        match decode_line(line) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.skipped += 1;
                tracing::warn!(
                    error = %e,
                    line = %String::from_utf8_lossy(line),
                    "skipping undecodable stream line"
                );
                None
            }
        }
    }
}

fn decode_line(line: &[u8]) -> Result<Option<DecodedLine>> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_slice(line)?;
    if value.get("error").is_some_and(serde_json::Value::is_object) {
        return Ok(Some(DecodedLine::Error(serde_json::from_value(value)?)));
    }
    Ok(Some(DecodedLine::Record(serde_json::from_value(value)?)))
}

/// Running counts reconstructed from a download stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadTally {
    /// Items stored successfully
    pub succeeded: u64,
    /// Items the gateway refused
    pub rejected: u64,
    /// Items the gateway could not be reached for
    pub errored: u64,
    /// Progress of the latest record
    pub progress: u8,
    /// Summary, once received
    pub summary: Option<SummaryRecord>,
    /// Terminal error message, if the run aborted
    pub failure: Option<String>,
}

impl DownloadTally {
    /// Account for one decoded line
    pub fn observe(&mut self, line: &DecodedLine) {
        match line {
            DecodedLine::Record(StreamRecord::Progress(record)) => self.observe_progress(record),
            DecodedLine::Record(StreamRecord::Summary(summary)) => {
                self.summary = Some(summary.clone());
            }
            DecodedLine::Error(api_error) => {
                self.failure = Some(api_error.error.message.clone());
            }
        }
    }

    fn observe_progress(&mut self, record: &ProgressRecord) {
        match record.status {
            ItemStatus::Success => self.succeeded += 1,
            ItemStatus::Failed => self.rejected += 1,
            ItemStatus::Error => self.errored += 1,
        }
        self.progress = record.progress;
    }

    /// Items processed so far
    pub fn processed(&self) -> u64 {
        self.succeeded + self.rejected + self.errored
    }

    /// Whether the stream closed with a successful summary
    pub fn is_complete(&self) -> bool {
        self.summary.as_ref().is_some_and(|s| s.success)
    }
}
