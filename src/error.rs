//! Error types for the sandbox terminal.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of an [`Error`], used by front ends to decide how
/// to render a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A path tried to escape the sandbox root.
    PermissionDenied,
    /// The command token is not in the command table.
    UnknownCommand,
    /// A file or directory does not exist.
    NotFound,
    /// The command was given malformed or unusable arguments.
    InvalidArgument,
    /// Any other operating-system failure.
    Io,
    /// Unrecoverable misconfiguration detected at startup.
    Startup,
}

/// Top-level error type for terminal operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The resolved path lies outside the sandbox root.
    #[error("permission denied: '{0}' is outside the sandbox")]
    PermissionDenied(String),

    /// No handler is registered for the command token.
    #[error("unknown command: {0} (type 'help' for a list)")]
    UnknownCommand(String),

    /// Missing file or directory.
    #[error("no such file or directory: {0}")]
    NotFound(String),

    /// Malformed command arguments.
    #[error("{0}")]
    InvalidArgument(String),

    /// A directory was required.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// A regular file was required.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// The destination of a copy already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// An OS operation failed on the given path.
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The sandbox root could not be established.
    #[error("invalid sandbox root {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// The interactive line editor failed.
    #[error("line editor: {0}")]
    Editor(String),

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Maps an I/O error on `path` (a virtual path) to the closest variant.
    pub fn from_io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path),
            std::io::ErrorKind::AlreadyExists => Error::AlreadyExists(path),
            _ => Error::Io { path, source },
        }
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Error::UnknownCommand(_) => ErrorKind::UnknownCommand,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidArgument(_)
            | Error::NotADirectory(_)
            | Error::IsADirectory(_)
            | Error::AlreadyExists(_) => ErrorKind::InvalidArgument,
            Error::Io { .. } | Error::Editor(_) => ErrorKind::Io,
            Error::InvalidRoot { .. } | Error::Config(_) => ErrorKind::Startup,
        }
    }

    /// Shorthand for the `"<cmd>: missing operand"` argument error.
    pub fn missing_operand(command: &str) -> Self {
        Error::InvalidArgument(format!("{}: missing operand", command))
    }
}

/// Result type alias for terminal operations.
pub type Result<T> = std::result::Result<T, Error>;
