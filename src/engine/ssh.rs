use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::BytesMut;
use russh::client::{self, Handle};
use russh::keys::{Algorithm, PrivateKey, PrivateKeyWithHashAlg};
use russh::{ChannelMsg, Disconnect};
use russh_sftp::client::SftpSession;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::client::fs::File;
use russh_sftp::protocol::{OpenFlags, StatusCode};
use tracing::{debug, info, warn};

use super::{Connector, Credential, KeyFormat, SftpChannel, SshTransport, Target};
use crate::error::{Error, RemoteErrorKind, Result};
use crate::types::{CommandOutput, FileMetadata, OpenMode};
use crate::utils::join_remote;

/// Host key policy: unknown hosts are trusted automatically, a key that
/// contradicts `~/.ssh/known_hosts` is refused.
#[derive(Debug)]
pub struct ClientHandler {
    host: String,
    port: u16,
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match russh::keys::check_known_hosts(&self.host, self.port, server_public_key) {
            Ok(true) => Ok(true),
            Ok(false) => {
                info!(
                    "Trusting unknown host key for {}:{} ({})",
                    self.host,
                    self.port,
                    server_public_key.algorithm()
                );
                Ok(true)
            }
            Err(russh::keys::Error::KeyChanged { line }) => {
                warn!(
                    "Host key for {}:{} does not match known_hosts line {}",
                    self.host, self.port, line
                );
                Ok(false)
            }
            Err(e) => {
                debug!("known_hosts not usable ({e}); trusting host key");
                Ok(true)
            }
        }
    }
}

/// Opens russh connections
#[derive(Clone)]
pub struct RusshConnector {
    config: Arc<client::Config>,
}

impl RusshConnector {
    /// Uses a non default [`russh::client::Config`]
    pub fn new(config: client::Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl Default for RusshConnector {
    fn default() -> Self {
        Self::new(client::Config::default())
    }
}

impl fmt::Debug for RusshConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RusshConnector").finish_non_exhaustive()
    }
}

fn algorithm_matches(algorithm: &Algorithm, format: KeyFormat) -> bool {
    match format {
        KeyFormat::Rsa => matches!(algorithm, Algorithm::Rsa { .. }),
        KeyFormat::Dsa => matches!(algorithm, Algorithm::Dsa),
    }
}

impl Connector for RusshConnector {
    type Transport = RusshTransport;
    type Key = PrivateKey;

    fn load_key(
        &self,
        path: &Path,
        passphrase: Option<&str>,
        format: KeyFormat,
    ) -> Result<PrivateKey> {
        let key = russh::keys::load_secret_key(path, passphrase).map_err(|e| match e {
            russh::keys::Error::IO(io) => Error::LocalIo(io),
            other => Error::KeyFormat {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;
        let algorithm = key.algorithm();
        if !algorithm_matches(&algorithm, format) {
            return Err(Error::KeyFormat {
                path: path.to_path_buf(),
                reason: format!("expected a {format} key, found {algorithm}"),
            });
        }
        Ok(key)
    }

    async fn connect(
        &self,
        target: &Target,
        credential: Credential<PrivateKey>,
    ) -> Result<RusshTransport> {
        let handler = ClientHandler {
            host: target.host.clone(),
            port: target.port,
        };
        let mut handle = client::connect(
            self.config.clone(),
            (target.host.as_str(), target.port),
            handler,
        )
        .await?;

        let auth = match credential {
            Credential::Password(password) => {
                handle
                    .authenticate_password(target.username.as_str(), password)
                    .await?
            }
            Credential::Key(key) => {
                let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
                handle
                    .authenticate_publickey(
                        target.username.as_str(),
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await?
            }
        };
        if !auth.success() {
            return Err(Error::Authentication {
                username: target.username.clone(),
                host: target.host.clone(),
            });
        }
        Ok(RusshTransport { handle })
    }
}

/// Authenticated russh connection
pub struct RusshTransport {
    handle: Handle<ClientHandler>,
}

impl RusshTransport {
    /// The raw russh handle, for channel types this crate does not wrap
    pub fn handle(&self) -> &Handle<ClientHandler> {
        &self.handle
    }
}

impl fmt::Debug for RusshTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RusshTransport")
            .field("closed", &self.handle.is_closed())
            .finish()
    }
}

impl SshTransport for RusshTransport {
    type Sftp = RusshSftp;

    async fn open_sftp(&mut self) -> Result<RusshSftp> {
        let channel = self.handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let session = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| remote_error("sftp", e))?;
        Ok(RusshSftp { session, cwd: None })
    }

    async fn exec(&mut self, command: &str) -> Result<CommandOutput> {
        let mut channel = self.handle.channel_open_session().await?;
        channel.exec(true, command).await?;

        let mut stdout = BytesMut::new();
        let mut stderr = BytesMut::new();
        let mut exit_status = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext: 1 } => stderr.extend_from_slice(data),
                // Data may still follow the exit status
                ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                _ => {}
            }
        }

        Ok(CommandOutput {
            stdout: stdout.freeze(),
            stderr: stderr.freeze(),
            exit_status,
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await?;
        Ok(())
    }
}

fn remote_error(path: &str, err: SftpError) -> Error {
    match err {
        SftpError::Status(status) => Error::RemoteIo {
            path: path.to_string(),
            kind: match status.status_code {
                StatusCode::NoSuchFile => RemoteErrorKind::NotFound,
                StatusCode::PermissionDenied => RemoteErrorKind::PermissionDenied,
                _ => RemoteErrorKind::Other,
            },
            message: status.error_message,
        },
        other => Error::RemoteIo {
            path: path.to_string(),
            kind: RemoteErrorKind::Other,
            message: other.to_string(),
        },
    }
}

fn open_flags(mode: OpenMode) -> OpenFlags {
    let mut flags = OpenFlags::empty();
    if mode.read {
        flags |= OpenFlags::READ;
    }
    if mode.write {
        flags |= OpenFlags::WRITE;
    }
    if mode.append {
        flags |= OpenFlags::APPEND;
    }
    if mode.create {
        flags |= OpenFlags::CREATE;
    }
    if mode.truncate {
        flags |= OpenFlags::TRUNCATE;
    }
    if mode.exclusive {
        flags |= OpenFlags::EXCLUDE;
    }
    flags
}

/// SFTP sub-channel with a client side working directory
///
/// The SFTP protocol has no notion of a current directory, so `chdir` records
/// a canonical path and every relative path is joined onto it.
pub struct RusshSftp {
    session: SftpSession,
    cwd: Option<String>,
}

impl RusshSftp {
    /// The raw russh-sftp session
    pub fn session(&self) -> &SftpSession {
        &self.session
    }

    fn resolve(&self, path: &str) -> String {
        join_remote(self.cwd.as_deref(), path)
    }
}

impl fmt::Debug for RusshSftp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RusshSftp").field("cwd", &self.cwd).finish()
    }
}

impl SftpChannel for RusshSftp {
    type File = File;

    async fn stat(&mut self, path: &str) -> Result<FileMetadata> {
        let path = self.resolve(path);
        let attrs = self
            .session
            .metadata(path.clone())
            .await
            .map_err(|e| remote_error(&path, e))?;
        Ok(FileMetadata::from_attrs(
            path,
            attrs.size,
            attrs.permissions,
            attrs.atime,
            attrs.mtime,
        ))
    }

    async fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = self.resolve(path);
        self.session
            .create_dir(path.clone())
            .await
            .map_err(|e| remote_error(&path, e))
    }

    async fn chdir(&mut self, path: Option<&str>) -> Result<()> {
        let Some(path) = path else {
            self.cwd = None;
            return Ok(());
        };
        let target = self.resolve(path);
        let metadata = self.stat(&target).await?;
        if !metadata.is_dir() {
            return Err(Error::RemoteIo {
                path: target,
                kind: RemoteErrorKind::Other,
                message: "not a directory".to_string(),
            });
        }
        let canonical = self
            .session
            .canonicalize(target.clone())
            .await
            .map_err(|e| remote_error(&target, e))?;
        self.cwd = Some(canonical);
        Ok(())
    }

    fn getcwd(&self) -> Option<String> {
        self.cwd.clone()
    }

    async fn listdir(&mut self, path: &str) -> Result<Vec<String>> {
        let path = self.resolve(path);
        let entries = self
            .session
            .read_dir(path.clone())
            .await
            .map_err(|e| remote_error(&path, e))?;
        Ok(entries
            .map(|entry| entry.file_name())
            .filter(|name| name != "." && name != "..")
            .collect())
    }

    async fn open(&mut self, path: &str, mode: OpenMode) -> Result<File> {
        let path = self.resolve(path);
        self.session
            .open_with_flags(path.clone(), open_flags(mode))
            .await
            .map_err(|e| remote_error(&path, e))
    }

    async fn close(&mut self) -> Result<()> {
        self.session
            .close()
            .await
            .map_err(|e| remote_error("sftp", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_flags_follow_mode() {
        assert_eq!(open_flags(OpenMode::read()).bits(), OpenFlags::READ.bits());
        assert_eq!(
            open_flags(OpenMode::write()).bits(),
            (OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE).bits()
        );
        assert_eq!(
            open_flags("a+".parse().unwrap()).bits(),
            (OpenFlags::READ | OpenFlags::WRITE | OpenFlags::APPEND | OpenFlags::CREATE).bits()
        );
        assert!(open_flags("x".parse().unwrap()).contains(OpenFlags::EXCLUDE));
    }

    #[test]
    fn rsa_and_dsa_algorithms_are_told_apart() {
        let rsa = Algorithm::Rsa { hash: None };
        assert!(algorithm_matches(&rsa, KeyFormat::Rsa));
        assert!(!algorithm_matches(&rsa, KeyFormat::Dsa));
        assert!(algorithm_matches(&Algorithm::Dsa, KeyFormat::Dsa));
        assert!(!algorithm_matches(&Algorithm::Ed25519, KeyFormat::Rsa));
    }

    #[test]
    fn unreadable_key_file_is_a_local_io_error() {
        let connector = RusshConnector::default();
        let err = connector
            .load_key(Path::new("/nonexistent/id_rsa"), None, KeyFormat::Rsa)
            .unwrap_err();
        assert!(matches!(err, Error::LocalIo(_)), "got {err:?}");
    }

    #[test]
    fn garbage_key_file_is_a_key_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id_rsa");
        std::fs::write(&path, "this is not a private key\n").unwrap();
        let err = RusshConnector::default()
            .load_key(&path, None, KeyFormat::Rsa)
            .unwrap_err();
        assert!(matches!(err, Error::KeyFormat { .. }), "got {err:?}");
    }
}
