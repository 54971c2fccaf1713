use std::path::PathBuf;
use thiserror::Error;

/// Failures that end a scan.
///
/// Per-message problems never show up here: those are [`DecodeError`]s and are
/// absorbed by the message processor.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The server rejected the credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// TCP, TLS or greeting failure before a session existed.
    #[error("could not connect to {host}:{port}: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    /// The mailbox listing or a fetch failed after scanning began.
    #[error("mailbox stream failed: {0}")]
    Stream(String),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl ScanError {
    /// True when the run failed because of bad credentials rather than a
    /// network or host problem.
    pub fn is_bad_credentials(&self) -> bool {
        matches!(self, ScanError::Auth(_))
    }

    pub fn is_connect_failure(&self) -> bool {
        matches!(self, ScanError::Connect { .. })
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed message: {0}")]
    Parse(#[from] mailparse::MailParseError),

    #[error("message has no headers")]
    NoHeaders,
}
