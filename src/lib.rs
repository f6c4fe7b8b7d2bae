//! A friendly SFTP session: connect with a password or key, move files,
//! manage remote directories and run commands over one SSH connection.

// Module declarations
mod auth;
mod client;
mod config;
pub mod engine;
mod error;
mod logging;
mod operations;
mod session;
mod types;
mod utils;

// Public API exports
pub use auth::AuthMethod;
pub use config::ConnectOptions;
pub use engine::ssh::{RusshConnector, RusshSftp, RusshTransport};
pub use error::{Error, RemoteErrorKind, Result};
pub use session::{RemoteFile, Session};
pub use types::{
    CommandOutput, FileMetadata, FileTransfer, FileType, OpenMode, SftpState, TransportState,
};

// Re-export commonly used external types for convenience
pub use futures::future::BoxFuture;
