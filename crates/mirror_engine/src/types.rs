use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::persist::PersistError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Decode => write!(f, "undecodable body"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

pub type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// The page did not have the structure the extractor expects.
    #[error("unexpected page shape: {reason}")]
    Extraction {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },
    #[error("page parsed but lists no acquisition links")]
    EmptyResult,
    #[error(transparent)]
    Network(#[from] FetchError),
    #[error("challenge still on screen after {0:?}")]
    ChallengeTimeout(Duration),
    #[error("integrity check failed for {path:?}: {reason}")]
    Integrity { path: PathBuf, reason: String },
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("browser session error: {0}")]
    Browser(String),
}

impl MirrorError {
    pub fn extraction(reason: impl Into<String>) -> Self {
        MirrorError::Extraction {
            reason: reason.into(),
            source: None,
        }
    }

    /// Wrap an arbitrary failure from an extraction collaborator, keeping the cause.
    pub fn extraction_caused_by(reason: impl Into<String>, source: impl Into<BoxError>) -> Self {
        MirrorError::Extraction {
            reason: reason.into(),
            source: Some(source.into()),
        }
    }

    pub fn integrity(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        MirrorError::Integrity {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// What happened to one catalog entry during a harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Saved,
    /// The page lists itself as its acquisition link; any stored record was removed.
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub title: String,
    pub url: String,
    pub outcome: ItemOutcome,
}

impl ItemReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Failed { .. })
    }
}

impl fmt::Display for ItemReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            ItemOutcome::Saved => write!(f, "[SUCCESS] Saved data for '{}'", self.title),
            ItemOutcome::Skipped => write!(
                f,
                "[SKIPPED] Removed '{}' because its page is listed as its own download",
                self.title
            ),
            ItemOutcome::Failed { reason } => {
                write!(f, "[ERROR] Failed harvesting '{}': {reason}", self.title)
            }
        }
    }
}

/// Counts for one batch (bulk harvest, update check or retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HarvestSummary {
    pub success: usize,
    pub failure: usize,
    pub skipped: usize,
}

impl HarvestSummary {
    pub fn record(&mut self, report: &ItemReport) {
        match report.outcome {
            ItemOutcome::Saved => self.success += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Failed { .. } => self.failure += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failure + self.skipped
    }
}

impl fmt::Display for HarvestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "successes: {}, failures: {}, skipped: {}",
            self.success, self.failure, self.skipped
        )
    }
}
