//! Error types for sbver_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using sbver_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while scanning, stamping, or persisting state.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A file is locked, missing, or not readable/writable.
    #[error("Cannot access {path}: {reason}")]
    Access { path: PathBuf, reason: String },

    /// A version header, version string, or config value is malformed.
    #[error("Format error: {reason}")]
    Format { reason: String },

    /// Persisted snapshot or backup data is corrupt.
    #[error("Parse error: {reason}")]
    Parse { reason: String },

    /// The major version component cannot be incremented any further.
    #[error("Version overflow: {version} cannot be incremented")]
    Overflow { version: String },

    /// Invalid hash format or encoding.
    #[error("Invalid hash: {reason}")]
    InvalidHash { reason: String },

    /// Project directory is missing or not initialized.
    #[error("Invalid project at {path}: {reason}")]
    InvalidProject { path: PathBuf, reason: String },

    /// Project is already initialized and `force` was not given.
    #[error("Project already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    /// Invalid ignore pattern.
    #[error("Invalid ignore pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl Error {
    /// Create an Access error.
    pub fn access(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Access {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a Format error.
    pub fn format(reason: impl Into<String>) -> Self {
        Error::Format {
            reason: reason.into(),
        }
    }

    /// Create a Parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Error::Parse {
            reason: reason.into(),
        }
    }

    /// Create an Overflow error.
    pub fn overflow(version: impl ToString) -> Self {
        Error::Overflow {
            version: version.to_string(),
        }
    }

    /// Create an InvalidHash error.
    pub fn invalid_hash(reason: impl Into<String>) -> Self {
        Error::InvalidHash {
            reason: reason.into(),
        }
    }

    /// Create an InvalidProject error.
    pub fn invalid_project(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidProject {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an AlreadyInitialized error.
    pub fn already_initialized(path: impl Into<PathBuf>) -> Self {
        Error::AlreadyInitialized { path: path.into() }
    }

    /// Create an InvalidPattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error that occurred on a specific file as an Access error.
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Error::Access {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Process exit code for an error that reached the top level.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Io { .. } => 1,
            Error::Format { .. } => 2,
            Error::Overflow { .. } => 3,
            Error::Access { .. } => 4,
            Error::Parse { .. } | Error::InvalidHash { .. } => 5,
            Error::InvalidProject { .. } | Error::AlreadyInitialized { .. } => 6,
            Error::InvalidPattern { .. } => 7,
        }
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        // ignore::Error can wrap an io::Error or be a path error
        match err.io_error() {
            Some(io_err) => Error::Io {
                source: std::io::Error::new(io_err.kind(), io_err.to_string()),
            },
            None => Error::Io {
                source: std::io::Error::other(err.to_string()),
            },
        }
    }
}
