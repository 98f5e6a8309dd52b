//! Connection pump failure reasons.

use thiserror::Error;

/// Why a connection pump stopped.
///
/// These never reach the hub or a publisher; they end one subscriber's
/// pumps and are logged.
#[derive(Error, Debug)]
pub enum PumpError {
    #[error("write timed out")]
    WriteTimeout,

    #[error("no keepalive acknowledgement before read deadline")]
    ReadTimeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("inbound message of {size} bytes exceeds limit of {limit}")]
    MessageTooLarge { size: usize, limit: usize },
}

impl PumpError {
    pub(crate) fn transport(e: impl std::fmt::Display) -> Self {
        Self::Transport(e.to_string())
    }
}
