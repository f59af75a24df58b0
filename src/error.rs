//! Error type of the yamal core.
//!
//! One variant per failure kind. OS errors are carried verbatim together with
//! a short context string (what was being done and where).

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum YamalError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unable to {0} using a readonly file descriptor")]
    ReadOnly(&'static str),

    #[error("invalid yamal file format: {0}")]
    InvalidFormat(String),

    #[error("unexpected EOF: page {page} is beyond file length {file_len}")]
    UnexpectedEof { page: usize, file_len: u64 },

    #[error("list {list} is closed")]
    Closed { list: usize },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} failed (poisoned)")]
    Poisoned(&'static str),
}

pub type Result<T> = std::result::Result<T, YamalError>;

impl YamalError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        YamalError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        YamalError::InvalidArgument(msg.into())
    }

    /// True for the permanent "list is closed" failure.
    pub fn is_closed(&self) -> bool {
        matches!(self, YamalError::Closed { .. })
    }
}
