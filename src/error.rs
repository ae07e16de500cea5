use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Where a colliding tag was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagLocation {
    Local,
    Remote,
}

impl fmt::Display for TagLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagLocation::Local => write!(f, "locally"),
            TagLocation::Remote => write!(f, "on the remote"),
        }
    }
}

/// Unified error type for rpm-tagger operations
#[derive(Error, Debug)]
pub enum TaggerError {
    #[error("Version source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Ambiguous version source: {pattern} matched {}", .candidates.join(", "))]
    AmbiguousVersion {
        pattern: String,
        candidates: Vec<String>,
    },

    #[error("Tag {tag} already exists {location}")]
    TagAlreadyExists { tag: String, location: TagLocation },

    #[error("HEAD already points at tag {0}")]
    WorkingTreeAlreadyAtTag(String),

    #[error("Cannot write metadata file {}: {source}", .path.display())]
    MetadataWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Commit failed: {0}")]
    Commit(String),

    #[error("Tag creation failed: {0}")]
    TagCreation(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rollback failed: {0}")]
    Rollback(String),

    #[error("Invalid workflow state: {0}")]
    InvalidState(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable classification of [TaggerError], independent of message text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SourceUnavailable,
    AmbiguousVersion,
    TagAlreadyExists(TagLocation),
    WorkingTreeAlreadyAtTag,
    MetadataWrite,
    Commit,
    TagCreation,
    Metadata,
    Config,
    Rollback,
    InvalidState,
    Git,
    Io,
}

/// Convenience type alias for Results in rpm-tagger
pub type Result<T> = std::result::Result<T, TaggerError>;

impl TaggerError {
    /// Create a source-unavailable error with context
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        TaggerError::SourceUnavailable(msg.into())
    }

    /// Create a metadata error with context
    pub fn metadata(msg: impl Into<String>) -> Self {
        TaggerError::Metadata(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        TaggerError::Config(msg.into())
    }

    pub fn commit(msg: impl Into<String>) -> Self {
        TaggerError::Commit(msg.into())
    }

    pub fn tag_creation(msg: impl Into<String>) -> Self {
        TaggerError::TagCreation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TaggerError::SourceUnavailable(_) => ErrorKind::SourceUnavailable,
            TaggerError::AmbiguousVersion { .. } => ErrorKind::AmbiguousVersion,
            TaggerError::TagAlreadyExists { location, .. } => ErrorKind::TagAlreadyExists(*location),
            TaggerError::WorkingTreeAlreadyAtTag(_) => ErrorKind::WorkingTreeAlreadyAtTag,
            TaggerError::MetadataWrite { .. } => ErrorKind::MetadataWrite,
            TaggerError::Commit(_) => ErrorKind::Commit,
            TaggerError::TagCreation(_) => ErrorKind::TagCreation,
            TaggerError::Metadata(_) => ErrorKind::Metadata,
            TaggerError::Config(_) => ErrorKind::Config,
            TaggerError::Rollback(_) => ErrorKind::Rollback,
            TaggerError::InvalidState(_) => ErrorKind::InvalidState,
            TaggerError::Git(_) => ErrorKind::Git,
            TaggerError::Io(_) => ErrorKind::Io,
        }
    }
}
