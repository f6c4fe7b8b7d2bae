use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a failed remote filesystem operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The remote path does not exist
    NotFound,
    /// The remote server refused access
    PermissionDenied,
    /// Any other remote failure
    Other,
}

impl From<io::ErrorKind> for RemoteErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => RemoteErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => RemoteErrorKind::PermissionDenied,
            _ => RemoteErrorKind::Other,
        }
    }
}

/// Errors returned by a [`Session`](crate::Session)
#[derive(Debug, Error)]
pub enum Error {
    /// No usable credential, or the connection options could not be understood
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The remote host rejected the supplied credential
    #[error("authentication failed for {username}@{host}")]
    Authentication { username: String, host: String },

    /// The private key is neither a readable RSA nor DSA key
    #[error("{} is not a usable RSA or DSA private key: {reason}", path.display())]
    KeyFormat { path: PathBuf, reason: String },

    /// A remote filesystem operation failed
    #[error("remote I/O error on {path}: {message}")]
    RemoteIo {
        path: String,
        kind: RemoteErrorKind,
        message: String,
    },

    /// A local filesystem operation failed
    #[error("local I/O error: {0}")]
    LocalIo(#[from] io::Error),

    /// SSH level failure reported by the engine
    #[error("ssh transport error: {0}")]
    Transport(#[from] russh::Error),

    /// A mode string that is not one of `r`, `w`, `a`, `x` with an optional `+`
    #[error("invalid open mode {0:?}")]
    InvalidOpenMode(String),

    /// The session has been closed
    #[error("session is closed")]
    Closed,
}

impl Error {
    /// Builds a [`Error::RemoteIo`] from an I/O error raised while reading or
    /// writing a remote file handle.
    pub fn remote(path: impl Into<String>, err: io::Error) -> Self {
        Error::RemoteIo {
            path: path.into(),
            kind: err.kind().into(),
            message: err.to_string(),
        }
    }

    /// True when the error reports a missing remote path.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::RemoteIo {
                kind: RemoteErrorKind::NotFound,
                ..
            }
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}
