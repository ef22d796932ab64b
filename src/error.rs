use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for ar archive operations
pub type Result<T> = std::result::Result<T, ArError>;

/// Unified error type for reading and writing ar archives
#[derive(Debug, Error)]
pub enum ArError {
    // Archive errors
    #[error("Invalid magic number: archive does not start with \"!<arch>\\n\"")]
    InvalidMagic,

    #[error("Malformed member header at offset {offset}: {reason}")]
    MalformedHeader { offset: u64, reason: String },

    #[error("No current member: advance the reader with next_entry() first")]
    NoCurrentMember,

    // Source errors
    #[error("Source file {path:?} changed while archiving: expected {expected} bytes, got {actual}")]
    SourceChanged {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Member {name:?} is too large for an ar header: {size} bytes (max {max})")]
    MemberTooLarge { name: String, size: u64, max: u64 },

    #[error("Invalid source path: {0}")]
    InvalidPath(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // Configuration errors
    #[error("Invalid write options: {0}")]
    Config(String),
}

impl ArError {
    pub(crate) fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        ArError::MalformedHeader {
            offset,
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for ArError {
    fn from(err: toml::de::Error) -> Self {
        ArError::Config(err.to_string())
    }
}
