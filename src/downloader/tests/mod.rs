use super::test_helpers::{
    Scripted, create_scripted_downloader, create_test_downloader, test_config,
};
use super::*;
use crate::types::{DownloadRequest, ItemStatus, ProgressRecord};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;


/// Run `request` to completion on `downloader`, collecting progress records
async fn run_collect(
    downloader: &RangeDownloader,
    request: DownloadRequest,
) -> (Vec<ProgressRecord>, Result<RunEnd>) {
    let (tx, mut rx) = mpsc::channel(64);
    let collector = tokio::spawn(async move {
        let mut records = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                RunEvent::Progress(record) => records.push(record),
                other => panic!("run() only emits progress events, got {:?}", other),
            }
        }
        records
    });

    let result = downloader
        .run(request, tx, CancellationToken::new())
        .await;
    let records = collector.await.unwrap();
    (records, result)
}

fn file_names(records: &[ProgressRecord]) -> Vec<String> {
    records.iter().map(|r| r.file_name.clone()).collect()
}
