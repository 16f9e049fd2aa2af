use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Which network step ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPhase {
    Connect,
    Read,
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutPhase::Connect => f.write_str("connect"),
            TimeoutPhase::Read => f.write_str("read"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Cannot prepare {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot reach {host}:{port}: {reason}")]
    Connectivity {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Timed out during {phase} after {after:?}")]
    Timeout { phase: TimeoutPhase, after: Duration },

    #[error("HTTP error {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Transfer failed: {0}")]
    Transfer(#[from] reqwest::Error),

    #[error("Download incomplete: received {received} of {expected} bytes")]
    IncompleteTransfer { received: u64, expected: u64 },

    #[error("Model archive is corrupt: {0}")]
    ArchiveCorrupt(String),

    #[error("Invalid model URL: {0}")]
    InvalidUrl(String),
}

/// Coarse failure classes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Filesystem,
    Connectivity,
    Timeout(TimeoutPhase),
    Network,
    IncompleteTransfer,
    ArchiveCorrupt,
}

impl ModelError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModelError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ModelError::Filesystem { .. } => FailureKind::Filesystem,
            ModelError::Connectivity { .. } => FailureKind::Connectivity,
            ModelError::Timeout { phase, .. } => FailureKind::Timeout(*phase),
            ModelError::HttpStatus { .. } | ModelError::Transfer(_) | ModelError::InvalidUrl(_) => {
                FailureKind::Network
            }
            ModelError::IncompleteTransfer { .. } => FailureKind::IncompleteTransfer,
            ModelError::ArchiveCorrupt(_) => FailureKind::ArchiveCorrupt,
        }
    }

    /// Error text plus a hint on what the user can do about it.
    pub fn user_message(&self) -> String {
        let hint = match self.kind() {
            FailureKind::Filesystem => {
                "Check that the model directory is writable and the disk has space."
            }
            FailureKind::Connectivity | FailureKind::Timeout(_) | FailureKind::Network => {
                "A firewall or proxy may be blocking the download. \
                 Check the network connection or install the model manually."
            }
            FailureKind::IncompleteTransfer => {
                "The connection dropped during the download. Please try again."
            }
            FailureKind::ArchiveCorrupt => {
                "The downloaded archive could not be unpacked. Please try again."
            }
        };
        format!("{} {}", self, hint)
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
