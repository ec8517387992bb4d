//! Revision engine error types

use crate::connection::ConnectionError;
use crate::executor::DbError;
use crate::revision::source::OperationError;
use crate::transaction::TransactionError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which operation of a revision was running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

/// Errors raised while loading, resolving, planning or applying revisions
///
/// Every variant is terminal for the current invocation: nothing is retried and the
/// enclosing transaction is rolled back.
#[derive(Debug, Error)]
pub enum RevisionError {
    /// Revision file cannot be turned into `{previous_version, up, down}`
    #[error("malformed revision file {file}: {reason}")]
    MalformedRevisionFile { file: String, reason: String },

    /// No revision without a previous version
    #[error("missing first revision: no revision file omits previous_version")]
    MissingRootRevision,

    /// More than one revision without a previous version
    #[error("ambiguous first revision: {} files omit previous_version ({})", files.len(), files.join(", "))]
    AmbiguousRoot { files: Vec<String> },

    /// The chain walked from the root does not cover every revision (fork, cycle or broken link)
    #[error("revisions are disjoint - check file {file}")]
    DisjointChain { file: String },

    #[error(
        "previous version invalid for file {file} - expected {} but got {}",
        display_version(expected),
        display_version(actual)
    )]
    PreviousVersionMismatch {
        file: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    /// Revision content changed after being applied
    #[error("version mismatch - expected {expected} but got {actual} for file {file}")]
    VersionMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("no upgrade path - cannot find revision file {file} for the current version")]
    NoUpgradePath { file: String },

    #[error("current revision module not found: {file}")]
    CurrentRevisionModuleNotFound { file: String },

    #[error("no downgrade path - missing revision dependency {previous_version} of file {file}")]
    MissingRevisionDependency {
        file: String,
        previous_version: String,
    },

    /// Persistence invariant violated
    #[error("found {count} current revisions for namespace {namespace}")]
    MultipleRevisionsFound { namespace: String, count: usize },

    /// A revision's own `up`/`down` failed
    #[error("revision {file} failed during {direction}: {source}")]
    OperationFailed {
        file: String,
        direction: Direction,
        #[source]
        source: OperationError,
    },

    #[error("revision directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("revision {file} is already registered")]
    AlreadyRegistered { file: String },

    #[error("revision file already exists: {0}")]
    RevisionFileExists(PathBuf),

    #[error("revision source cannot generate new revision files")]
    TemplateUnsupported,

    #[error("invalid SQL identifier: {0}")]
    InvalidIdentifier(String),

    #[error("exclusive revision lock is held by another writer")]
    LockUnavailable,

    #[error("connection has been shut down")]
    ConnectionClosed,

    /// A thread panicked while holding the in-memory revision state
    #[error("in-memory revision state poisoned")]
    StatePoisoned,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

impl RevisionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RevisionError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(file: impl Into<String>, reason: impl Into<String>) -> Self {
        RevisionError::MalformedRevisionFile {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

fn display_version(version: &Option<String>) -> &str {
    version.as_deref().unwrap_or("undefined (base)")
}
