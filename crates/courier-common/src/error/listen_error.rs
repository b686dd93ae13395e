//! Listen error taxonomy
//!
//! Every failure in the read loop is triaged into exactly one of these
//! kinds, and the kind alone decides what the loop does next: retry, sleep
//! then retry, rotate the edge shard, skip the record, or stop.

use thiserror::Error;

/// Upstream status codes that signal a bad edge shard rather than a dead
/// session. Empirically derived from upstream behavior; not assumed to be
/// exhaustive.
pub const ROTATE_STATUSES: &[u16] = &[502, 503];

/// Errors raised by the listen pipeline
#[derive(Debug, Error)]
pub enum ListenError {
    /// A bounded read elapsed without data. Expected; retry immediately.
    #[error("transport read timed out")]
    Timeout,

    /// The connection dropped mid-read. Retry after a cool-down so a dead
    /// upstream does not turn the loop into a busy-wait.
    #[error("transport connection lost: {0}")]
    ConnectionLost(String),

    /// The upstream signalled a channel error. Rotate the edge shard, then
    /// retry.
    #[error("channel error (status {status})")]
    ChannelError { status: u16 },

    /// A frame or delta did not have the expected shape. Recoverable at
    /// single-record granularity.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// JSON that did not parse. Recoverable at single-record granularity.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Anything else. Propagated; the loop stops.
    #[error("fatal listen error: {0}")]
    Fatal(#[source] anyhow::Error),
}

impl ListenError {
    /// Triage an upstream HTTP status into a channel error or a fatal one
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        if ROTATE_STATUSES.contains(&status) {
            Self::ChannelError { status }
        } else {
            Self::Fatal(anyhow::anyhow!("unexpected upstream status {status}"))
        }
    }

    /// Whether the read loop may continue after this error
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Fatal(_))
    }

    /// Whether this error moves the long-poll channel to the next edge shard
    #[must_use]
    pub fn rotates_shard(&self) -> bool {
        matches!(self, Self::ChannelError { .. })
    }

    /// Whether a cool-down sleep must precede the retry
    #[must_use]
    pub fn requires_cooldown(&self) -> bool {
        matches!(self, Self::ConnectionLost(_))
    }

    /// Whether this failure is scoped to a single record rather than the
    /// whole connection
    #[must_use]
    pub fn is_record_scoped(&self) -> bool {
        matches!(self, Self::MalformedFrame(_) | Self::Parse(_))
    }

    /// Stable machine-readable code for this error
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "TIMEOUT",
            Self::ConnectionLost(_) => "CONNECTION_LOST",
            Self::ChannelError { .. } => "CHANNEL_ERROR",
            Self::MalformedFrame(_) => "MALFORMED_FRAME",
            Self::Parse(_) => "PARSE_ERROR",
            Self::Fatal(_) => "FATAL",
        }
    }

    /// Create a fatal error from any error
    pub fn fatal(err: impl Into<anyhow::Error>) -> Self {
        Self::Fatal(err.into())
    }

    /// Create a malformed-frame error
    #[must_use]
    pub fn malformed(msg: impl std::fmt::Display) -> Self {
        Self::MalformedFrame(msg.to_string())
    }
}

/// Result type alias for listen operations
pub type ListenResult<T> = Result<T, ListenError>;
