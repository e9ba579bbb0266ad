//! The sequential range loop and the handle to a spawned run.

use super::RangeDownloader;
use crate::error::{Error, Result};
use crate::types::{
    DownloadRequest, FetchOutcome, ProgressRecord, SummaryRecord, progress_percent,
};
use futures::Stream;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Records buffered between the run task and its consumer
const RUN_EVENT_BUFFER: usize = 32;

/// Something a run reports to its consumer
#[derive(Debug)]
pub enum RunEvent {
    /// One identifier was processed
    Progress(ProgressRecord),
    /// The whole range was processed; no further events follow
    Complete(SummaryRecord),
    /// A local storage fault aborted the run; no further events follow
    Failed(Error),
}

/// How a run loop ended without a fatal error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEnd {
    /// Every identifier up to `end` was processed
    Completed(SummaryRecord),
    /// Cancelled or abandoned by the consumer before reaching `end`
    Cancelled,
}

impl RangeDownloader {
    /// Process `request` sequentially, sending one progress event per identifier to `events`
    ///
    /// Validation and storage preparation happen before any fetch. Per-item
    /// rejections and transport failures never stop the loop; only a storage
    /// fault does, returning `Err` with no summary. Cancelling `cancel` or
    /// dropping the receiving end of `events` abandons any in-flight fetch or
    /// pause and returns [`RunEnd::Cancelled`]. Files already written stay on disk.
    pub async fn run(
        &self,
        request: DownloadRequest,
        events: mpsc::Sender<RunEvent>,
        cancel: CancellationToken,
    ) -> Result<RunEnd> {
        request.validate()?;
        self.prepare_storage().await?;
        self.run_prepared(request, events, cancel).await
    }

    /// Validate, prepare storage, then spawn the run loop on its own task
    ///
    /// Validation and storage errors are returned here, before anything is
    /// spawned, so a caller can answer with a single error response.
    pub async fn start(self: &Arc<Self>, request: DownloadRequest) -> Result<DownloadRun> {
        request.validate()?;
        self.prepare_storage().await?;

        let (event_tx, event_rx) = mpsc::channel(RUN_EVENT_BUFFER);
        let cancel = CancellationToken::new();
        let downloader = Arc::clone(self);
        let token = cancel.clone();

        tokio::spawn(async move {
            let terminal = match downloader
                .run_prepared(request, event_tx.clone(), token)
                .await
            {
                Ok(RunEnd::Completed(summary)) => RunEvent::Complete(summary),
                Ok(RunEnd::Cancelled) => return,
                Err(e) => RunEvent::Failed(e),
            };
            // Consumer may already be gone
            event_tx.send(terminal).await.ok();
        });

        Ok(DownloadRun {
            events: event_rx,
            cancel: cancel.clone(),
            _cancel_on_drop: cancel.drop_guard(),
            request,
        })
    }

    async fn run_prepared(
        &self,
        request: DownloadRequest,
        events: mpsc::Sender<RunEvent>,
        cancel: CancellationToken,
    ) -> Result<RunEnd> {
        let total = request.total();
        let delay = request.delay();

        tracing::info!(
            start = request.start,
            end = request.end,
            delay_ms = request.delay_ms,
            total = %total,
            "starting range download"
        );

        let mut succeeded: u64 = 0;
        for id in request.ids() {
            let file_name = id.file_name();
            let destination = self.destination_for(&file_name);
            let position = request.position_of(id);

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.cancelled(id.get())),
                _ = events.closed() => return Ok(self.cancelled(id.get())),
                outcome = self.fetcher.fetch(&file_name, &destination) => outcome,
            };

            let outcome = outcome.inspect_err(|e| {
                tracing::error!(resource = %file_name, error = %e, "storage fault, aborting range download");
            })?;

            let progress = progress_percent(position, total);
            match &outcome {
                FetchOutcome::Success { raw_content, .. } => {
                    succeeded += 1;
                    tracing::debug!(resource = %file_name, bytes = raw_content.len(), progress, "downloaded");
                }
                FetchOutcome::Rejected { status_code, .. } => {
                    tracing::warn!(resource = %file_name, status = status_code, progress, "gateway rejected resource");
                }
                FetchOutcome::Errored { message, .. } => {
                    tracing::warn!(resource = %file_name, error = %message, progress, "could not reach gateway");
                }
            }

            if events
                .send(RunEvent::Progress(outcome.into_record(progress)))
                .await
                .is_err()
            {
                return Ok(self.cancelled(id.get()));
            }

            if id.get() < request.end && !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(self.cancelled(id.get())),
                    _ = events.closed() => return Ok(self.cancelled(id.get())),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        tracing::info!(
            start = request.start,
            end = request.end,
            succeeded,
            total = %total,
            "range download complete"
        );

        Ok(RunEnd::Completed(SummaryRecord::complete(
            self.config.storage.public_path.clone(),
        )))
    }

    fn cancelled(&self, at: u64) -> RunEnd {
        tracing::info!(resource_id = at, "range download cancelled");
        RunEnd::Cancelled
    }
}

/// Handle to a spawned run
///
/// Dropping the handle cancels the run: the in-flight fetch is abandoned and no
/// further identifiers are processed.
pub struct DownloadRun {
    events: mpsc::Receiver<RunEvent>,
    cancel: CancellationToken,
    _cancel_on_drop: DropGuard,
    request: DownloadRequest,
}

impl DownloadRun {
    /// The validated request this run is processing
    pub fn request(&self) -> &DownloadRequest {
        &self.request
    }

    /// Next event, or `None` once the run has finished or been cancelled
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Stop the run after the current point
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Consume the handle as a stream of events
    pub fn into_stream(self) -> impl Stream<Item = RunEvent> + Send + 'static {
        futures::stream::unfold(self, |mut run| async move {
            run.next_event().await.map(|event| (event, run))
        })
    }

    /// Drain the run, returning every progress record and the terminal result
    ///
    /// Returns `Ok(None)` when the run ended without a terminal event (cancelled).
    pub async fn collect(mut self) -> (Vec<ProgressRecord>, Result<Option<SummaryRecord>>) {
        let mut records = Vec::new();
        while let Some(event) = self.next_event().await {
            match event {
                RunEvent::Progress(record) => records.push(record),
                RunEvent::Complete(summary) => return (records, Ok(Some(summary))),
                RunEvent::Failed(e) => return (records, Err(e)),
            }
        }
        (records, Ok(None))
    }
}
