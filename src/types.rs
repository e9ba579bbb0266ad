//! Core types for ipfs-dl

use crate::config::RangeDefaults;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Numeric identifier of one gateway resource
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

impl ResourceId {
    /// Create a new ResourceId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Remote resource name, also used verbatim as the local file name
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl From<u64> for ResourceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ResourceId> for u64 {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ResourceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Request body for a range download where every field is optional
///
/// Omitted fields are filled from [`RangeDefaults`]. `delay` is accepted as an
/// alias of `delayMs`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartialDownloadRequest {
    /// First identifier
    pub start: Option<u64>,
    /// Last identifier, inclusive
    pub end: Option<u64>,
    /// Pause between items in milliseconds
    #[serde(alias = "delay")]
    pub delay_ms: Option<u64>,
}

/// A bounded, inclusive range of identifiers to fetch sequentially
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    /// First identifier
    pub start: u64,
    /// Last identifier, inclusive
    pub end: u64,
    /// Pause between items in milliseconds
    #[serde(alias = "delay")]
    pub delay_ms: u64,
}

impl DownloadRequest {
    /// Create a request
    pub fn new(start: u64, end: u64, delay_ms: u64) -> Self {
        Self {
            start,
            end,
            delay_ms,
        }
    }

    /// Fill omitted fields from the configured defaults
    pub fn from_partial(partial: PartialDownloadRequest, defaults: &RangeDefaults) -> Self {
        Self {
            start: partial.start.unwrap_or(defaults.start),
            end: partial.end.unwrap_or(defaults.end),
            delay_ms: partial.delay_ms.unwrap_or(defaults.delay_ms),
        }
    }

    /// Reject ranges whose start lies past their end
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(Error::validation(
                "start",
                format!(
                    "start ({}) must be less than or equal to end ({})",
                    self.start, self.end
                ),
            ));
        }
        Ok(())
    }

    /// Number of identifiers in the range (`end - start + 1`)
    ///
    /// Widened to u128 so `0..=u64::MAX` does not overflow.
    pub fn total(&self) -> u128 {
        u128::from(self.end.saturating_sub(self.start)) + 1
    }

    /// Identifiers in ascending order
    pub fn ids(&self) -> impl Iterator<Item = ResourceId> + use<> {
        (self.start..=self.end).map(ResourceId)
    }

    /// 1-based position of `id` within the range
    pub fn position_of(&self, id: ResourceId) -> u128 {
        u128::from(id.get().saturating_sub(self.start)) + 1
    }

    /// Pause between items
    pub fn delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.delay_ms)
    }
}

/// Rounded completion percentage after `position` of `total` items (1-based)
///
/// Computes `round(100 * position / total)` in integers, rounding halves up, so
/// the final item always yields exactly 100.
pub fn progress_percent(position: u128, total: u128) -> u8 {
    if total == 0 {
        return 100;
    }
    let position = position.min(total);
    let rounded = (200 * position + total) / (2 * total);
    rounded as u8
}

/// Classified result of fetching one resource
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Remote answered with a success status; content was persisted verbatim
    Success {
        /// Resource and local file name
        file_name: String,
        /// Bytes written to disk
        raw_content: Vec<u8>,
    },
    /// Remote answered with a non-success status; nothing was persisted
    Rejected {
        /// Resource and local file name
        file_name: String,
        /// Observed HTTP status code
        status_code: u16,
    },
    /// Connection failure or timeout; nothing was persisted
    Errored {
        /// Resource and local file name
        file_name: String,
        /// Description of the transport failure
        message: String,
    },
}

impl FetchOutcome {
    /// Resource and local file name
    pub fn file_name(&self) -> &str {
        match self {
            FetchOutcome::Success { file_name, .. }
            | FetchOutcome::Rejected { file_name, .. }
            | FetchOutcome::Errored { file_name, .. } => file_name,
        }
    }

    /// Convert into the record streamed to the caller
    pub fn into_record(self, progress: u8) -> ProgressRecord {
        match self {
            FetchOutcome::Success { file_name, .. } => ProgressRecord {
                file_name,
                status: ItemStatus::Success,
                status_code: None,
                error: None,
                progress,
            },
            FetchOutcome::Rejected {
                file_name,
                status_code,
            } => ProgressRecord {
                file_name,
                status: ItemStatus::Failed,
                status_code: Some(status_code),
                error: None,
                progress,
            },
            FetchOutcome::Errored { file_name, message } => ProgressRecord {
                file_name,
                status: ItemStatus::Error,
                status_code: None,
                error: Some(message),
                progress,
            },
        }
    }
}

/// Per-item status as reported on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Fetched and stored
    Success,
    /// Remote refused with a non-success status code
    Failed,
    /// Remote could not be reached
    Error,
}

/// One streamed record per identifier
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Resource and local file name (`"{id}.json"`)
    pub file_name: String,
    /// Classified outcome
    pub status: ItemStatus,
    /// HTTP status code, present when `status` is "failed"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Transport error message, present when `status` is "error"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Completion percentage after this item (0-100)
    pub progress: u8,
}

/// Final record closing a completed stream
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    /// Always true for a completed run
    pub success: bool,
    /// Human-readable completion message
    pub message: String,
    /// Where stored files can be found
    pub download_path: String,
}

impl SummaryRecord {
    /// Summary for a run that reached the end of its range
    pub fn complete(download_path: impl Into<String>) -> Self {
        Self {
            success: true,
            message: "Download complete".to_string(),
            download_path: download_path.into(),
        }
    }
}

/// Any record that can appear in a download stream
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamRecord {
    /// Per-item progress
    Progress(ProgressRecord),
    /// Terminal summary
    Summary(SummaryRecord),
}
