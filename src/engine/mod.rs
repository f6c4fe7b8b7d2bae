//! The SSH/SFTP engine a [`Session`](crate::Session) drives.
//!
//! A session never speaks the wire protocol itself. It needs a way to parse
//! key material, to open an authenticated transport, to open an SFTP
//! sub-channel and exec channels on that transport, and a handful of
//! primitive filesystem calls. Those needs are the three traits below;
//! [`ssh`] implements them on top of `russh` and `russh-sftp`.

use std::fmt;
use std::future::Future;
use std::path::Path;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;
use crate::types::{CommandOutput, FileMetadata, OpenMode};

/// Engine backed by `russh` and `russh-sftp`
pub mod ssh;

/// Where and as whom to connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub username: String,
}

/// A resolved credential handed to [`Connector::connect`]
pub enum Credential<K> {
    Password(String),
    Key(K),
}

impl<K> fmt::Debug for Credential<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
            Credential::Key(_) => f.write_str("Key(<private key>)"),
        }
    }
}

/// Private key formats tried, in order, when loading a key file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    Rsa,
    Dsa,
}

impl fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyFormat::Rsa => f.write_str("RSA"),
            KeyFormat::Dsa => f.write_str("DSA"),
        }
    }
}

/// Opens authenticated transports
pub trait Connector: Sync {
    type Transport: SshTransport;
    type Key: Send;

    /// Parses the key at `path` as `format`.
    ///
    /// Must return [`Error::KeyFormat`](crate::Error::KeyFormat) when the file
    /// is not a key of that format so the caller can try the next one, and
    /// [`Error::LocalIo`](crate::Error::LocalIo) when it cannot be read.
    fn load_key(&self, path: &Path, passphrase: Option<&str>, format: KeyFormat)
    -> Result<Self::Key>;

    /// Connects to `target` and authenticates with `credential`.
    fn connect(
        &self,
        target: &Target,
        credential: Credential<Self::Key>,
    ) -> impl Future<Output = Result<Self::Transport>> + Send;
}

/// An authenticated SSH connection
pub trait SshTransport: Send + 'static {
    type Sftp: SftpChannel;

    /// Opens the SFTP subsystem on a new channel
    fn open_sftp(&mut self) -> impl Future<Output = Result<Self::Sftp>> + Send;

    /// Runs `command` on a fresh exec channel and collects its output
    fn exec(&mut self, command: &str) -> impl Future<Output = Result<CommandOutput>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// An open SFTP sub-channel
///
/// Relative paths resolve against the working directory set with
/// [`chdir`](SftpChannel::chdir), or against the server's default directory
/// when none has been set.
pub trait SftpChannel: Send + 'static {
    /// Remote file handle, closed by `AsyncWriteExt::shutdown`
    type File: AsyncRead + AsyncWrite + Unpin + Send;

    fn stat(&mut self, path: &str) -> impl Future<Output = Result<FileMetadata>> + Send;

    fn mkdir(&mut self, path: &str) -> impl Future<Output = Result<()>> + Send;

    /// Changes the working directory; `None` resets it to the server default
    fn chdir(&mut self, path: Option<&str>) -> impl Future<Output = Result<()>> + Send;

    /// The working directory, `None` until one has been set
    fn getcwd(&self) -> Option<String>;

    /// Entry names of a directory, without `.` and `..`
    fn listdir(&mut self, path: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    fn open(
        &mut self,
        path: &str,
        mode: OpenMode,
    ) -> impl Future<Output = Result<Self::File>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
