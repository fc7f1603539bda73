use std::{path::PathBuf, time::Duration};

use crate::protocol::CommandKind;

/// Core error type.
///
/// Adapter crates map their specific errors into this type so both actors can
/// handle failures consistently (alert to the user vs log-and-drop).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store error: {path}: {reason}")]
    Store { path: PathBuf, reason: String },

    #[error("external error: {0}")]
    External(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("{kind} was not acknowledged within {waited:?}")]
    Timeout { kind: CommandKind, waited: Duration },

    #[error("{kind} failed on the data side: {reason}")]
    Rejected { kind: CommandKind, reason: String },
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
