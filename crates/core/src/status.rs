//! Canonical run status vocabulary and the normalizer that maps backend
//! and legacy tokens onto it.
//!
//! The backend has used several spellings over time (`completed`,
//! `success`, `cancelled`, ...) and older cache revisions stored
//! localized labels. Everything funnels through [`normalize_status`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire token for [`Status::Queued`].
pub const STATUS_QUEUED: &str = "queued";

/// Wire token for [`Status::Running`].
pub const STATUS_RUNNING: &str = "running";

/// Wire token for [`Status::Done`].
pub const STATUS_DONE: &str = "done";

/// Wire token for [`Status::Failed`].
pub const STATUS_FAILED: &str = "failed";

/// Wire token for [`Status::Canceling`].
pub const STATUS_CANCELING: &str = "canceling";

/// Wire token for [`Status::Canceled`].
pub const STATUS_CANCELED: &str = "canceled";

// Localized labels written by older cache revisions are accepted as
// synonyms so a legacy snapshot normalizes cleanly.
const QUEUED_SYNONYMS: &[&str] = &[STATUS_QUEUED, "pending", "waiting", "created", "排队中"];
const RUNNING_SYNONYMS: &[&str] = &[STATUS_RUNNING, "started", "processing", "in_progress", "运行中"];
const DONE_SYNONYMS: &[&str] = &[
    STATUS_DONE,
    "completed",
    "complete",
    "success",
    "succeeded",
    "finished",
    "已完成",
];
const FAILED_SYNONYMS: &[&str] = &[STATUS_FAILED, "error", "failure", "失败"];
const CANCELING_SYNONYMS: &[&str] = &[STATUS_CANCELING, "cancelling", "取消中"];
const CANCELED_SYNONYMS: &[&str] = &[STATUS_CANCELED, "cancelled", "aborted", "revoked", "已取消"];

/// Lifecycle state of a run.
///
/// Unrecognized backend values are preserved verbatim in
/// [`Status::Other`] so they stay visible instead of being folded into a
/// wrong bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Queued,
    Running,
    Done,
    Failed,
    Canceling,
    Canceled,
    Other(String),
}

impl Status {
    /// `true` for states the backend never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Done | Status::Failed | Status::Canceled)
    }

    /// Lowercase wire token, or the raw value for [`Status::Other`].
    pub fn as_str(&self) -> &str {
        match self {
            Status::Queued => STATUS_QUEUED,
            Status::Running => STATUS_RUNNING,
            Status::Done => STATUS_DONE,
            Status::Failed => STATUS_FAILED,
            Status::Canceling => STATUS_CANCELING,
            Status::Canceled => STATUS_CANCELED,
            Status::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Status {
    fn from(raw: String) -> Self {
        normalize_status(&raw)
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Other(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

/// Map any backend or legacy status token onto the canonical vocabulary.
///
/// Matching is case-insensitive and ignores surrounding whitespace.
/// Unknown tokens come back as [`Status::Other`] holding the input
/// unchanged.
pub fn normalize_status(raw: &str) -> Status {
    let token = raw.trim().to_lowercase();
    let token = token.as_str();

    if QUEUED_SYNONYMS.contains(&token) {
        Status::Queued
    } else if RUNNING_SYNONYMS.contains(&token) {
        Status::Running
    } else if DONE_SYNONYMS.contains(&token) {
        Status::Done
    } else if FAILED_SYNONYMS.contains(&token) {
        Status::Failed
    } else if CANCELING_SYNONYMS.contains(&token) {
        Status::Canceling
    } else if CANCELED_SYNONYMS.contains(&token) {
        Status::Canceled
    } else {
        Status::Other(raw.to_string())
    }
}

/// Free-function form of [`Status::is_terminal`].
pub fn is_terminal(status: &Status) -> bool {
    status.is_terminal()
}
