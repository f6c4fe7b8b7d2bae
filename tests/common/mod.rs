//! In-memory engine used by the integration tests.
//!
//! `MockServer` holds a tiny remote filesystem plus counters describing how
//! the session drove the engine (connections, sub-channels, open handles).

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use bytes::Bytes;
use simple_sftp::engine::{Connector, Credential, KeyFormat, SftpChannel, SshTransport, Target};
use simple_sftp::{
    CommandOutput, ConnectOptions, Error, FileMetadata, OpenMode, RemoteErrorKind, Result, Session,
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

pub const HOME: &str = "/home/tester";

#[derive(Default)]
pub struct RemoteState {
    pub files: BTreeMap<String, Vec<u8>>,
    pub dirs: BTreeSet<String>,
    /// Paths whose stat and mkdir fail with permission denied
    pub forbidden: BTreeSet<String>,
    pub commands: HashMap<String, CommandOutput>,
    pub accepted_password: Option<String>,
    pub last_credential: Option<String>,
    pub connects: usize,
    pub sftp_opens: usize,
    pub sftp_closes: usize,
    pub transport_closes: usize,
    pub open_handles: usize,
    pub mkdir_calls: Vec<String>,
    pub fail_sftp_close: bool,
}

#[derive(Clone)]
pub struct MockServer {
    state: Arc<Mutex<RemoteState>>,
}

impl MockServer {
    pub fn new() -> Self {
        let mut state = RemoteState::default();
        for dir in ["/", "/home", HOME] {
            state.dirs.insert(dir.to_string());
        }
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap()
    }

    pub fn add_dir(&self, path: &str) -> &Self {
        self.state().dirs.insert(path.to_string());
        self
    }

    pub fn add_file(&self, path: &str, contents: &[u8]) -> &Self {
        self.state().files.insert(path.to_string(), contents.to_vec());
        self
    }

    pub fn forbid(&self, path: &str) -> &Self {
        self.state().forbidden.insert(path.to_string());
        self
    }

    pub fn on_command(&self, command: &str, stdout: &str, stderr: &str, exit_status: u32) -> &Self {
        self.state().commands.insert(
            command.to_string(),
            CommandOutput {
                stdout: Bytes::from(stdout.to_string()),
                stderr: Bytes::from(stderr.to_string()),
                exit_status: Some(exit_status),
            },
        );
        self
    }

    pub fn accept_password(&self, password: &str) -> &Self {
        self.state().accepted_password = Some(password.to_string());
        self
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(path).cloned()
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector {
            server: self.clone(),
        }
    }

    /// A password session against this server
    pub async fn session(&self) -> Session<MockTransport> {
        let options = ConnectOptions::new("mock.example.com")
            .username("tester")
            .password("secret");
        Session::connect_with(&self.connector(), options)
            .await
            .expect("mock connection")
    }
}

fn remote_err(path: &str, kind: RemoteErrorKind, message: &str) -> Error {
    Error::RemoteIo {
        path: path.to_string(),
        kind,
        message: message.to_string(),
    }
}

fn parent_of(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
        None => ".".to_string(),
    }
}

fn resolve(cwd: Option<&str>, path: &str) -> String {
    let base = cwd.unwrap_or(HOME);
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{base}/{path}")
    };
    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Key files hold the text `RSA` or `DSA`
pub struct MockConnector {
    server: MockServer,
}

impl Connector for MockConnector {
    type Transport = MockTransport;
    type Key = KeyFormat;

    fn load_key(&self, path: &Path, _passphrase: Option<&str>, format: KeyFormat) -> Result<KeyFormat> {
        let contents = std::fs::read_to_string(path)?;
        let found = match contents.trim() {
            "RSA" => Some(KeyFormat::Rsa),
            "DSA" => Some(KeyFormat::Dsa),
            _ => None,
        };
        if found == Some(format) {
            Ok(format)
        } else {
            Err(Error::KeyFormat {
                path: path.to_path_buf(),
                reason: format!("not a {format} key"),
            })
        }
    }

    async fn connect(&self, target: &Target, credential: Credential<KeyFormat>) -> Result<MockTransport> {
        let mut state = self.server.state();
        state.connects += 1;
        match credential {
            Credential::Password(password) => {
                state.last_credential = Some("password".to_string());
                if state
                    .accepted_password
                    .as_ref()
                    .is_some_and(|accepted| *accepted != password)
                {
                    return Err(Error::Authentication {
                        username: target.username.clone(),
                        host: target.host.clone(),
                    });
                }
            }
            Credential::Key(format) => {
                state.last_credential = Some(format.to_string());
            }
        }
        Ok(MockTransport {
            server: self.server.clone(),
        })
    }
}

pub struct MockTransport {
    server: MockServer,
}

impl SshTransport for MockTransport {
    type Sftp = MockSftp;

    async fn open_sftp(&mut self) -> Result<MockSftp> {
        self.server.state().sftp_opens += 1;
        Ok(MockSftp {
            server: self.server.clone(),
            cwd: None,
        })
    }

    async fn exec(&mut self, command: &str) -> Result<CommandOutput> {
        let state = self.server.state();
        Ok(state.commands.get(command).cloned().unwrap_or(CommandOutput {
            stdout: Bytes::new(),
            stderr: Bytes::from(format!("sh: {command}: command not found\n")),
            exit_status: Some(127),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.server.state().transport_closes += 1;
        Ok(())
    }
}

pub struct MockSftp {
    server: MockServer,
    cwd: Option<String>,
}

impl MockSftp {
    fn resolve(&self, path: &str) -> String {
        resolve(self.cwd.as_deref(), path)
    }
}

impl SftpChannel for MockSftp {
    type File = MockFile;

    async fn stat(&mut self, path: &str) -> Result<FileMetadata> {
        let path = self.resolve(path);
        let state = self.server.state();
        if state.forbidden.contains(&path) {
            return Err(remote_err(&path, RemoteErrorKind::PermissionDenied, "permission denied"));
        }
        if state.dirs.contains(&path) {
            return Ok(FileMetadata::from_attrs(path, Some(4096), Some(0o040755), None, None));
        }
        match state.files.get(&path) {
            Some(data) => Ok(FileMetadata::from_attrs(
                path.clone(),
                Some(data.len() as u64),
                Some(0o100644),
                None,
                None,
            )),
            None => Err(remote_err(&path, RemoteErrorKind::NotFound, "no such file")),
        }
    }

    async fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = self.resolve(path);
        let mut state = self.server.state();
        state.mkdir_calls.push(path.clone());
        if state.forbidden.contains(&path) {
            return Err(remote_err(&path, RemoteErrorKind::PermissionDenied, "permission denied"));
        }
        if state.dirs.contains(&path) || state.files.contains_key(&path) {
            return Err(remote_err(&path, RemoteErrorKind::Other, "failure"));
        }
        if !state.dirs.contains(&parent_of(&path)) {
            return Err(remote_err(&path, RemoteErrorKind::NotFound, "no such file"));
        }
        state.dirs.insert(path);
        Ok(())
    }

    async fn chdir(&mut self, path: Option<&str>) -> Result<()> {
        let Some(path) = path else {
            self.cwd = None;
            return Ok(());
        };
        let path = self.resolve(path);
        if !self.server.state().dirs.contains(&path) {
            return Err(remote_err(&path, RemoteErrorKind::NotFound, "no such directory"));
        }
        self.cwd = Some(path);
        Ok(())
    }

    fn getcwd(&self) -> Option<String> {
        self.cwd.clone()
    }

    async fn listdir(&mut self, path: &str) -> Result<Vec<String>> {
        let dir = self.resolve(path);
        let state = self.server.state();
        if !state.dirs.contains(&dir) {
            return Err(remote_err(&dir, RemoteErrorKind::NotFound, "no such directory"));
        }
        let children = state
            .dirs
            .iter()
            .filter(|d| *d != "/")
            .chain(state.files.keys())
            .filter(|p| parent_of(p) == dir)
            .map(|p| p.rsplit('/').next().unwrap_or_default().to_string())
            .collect::<BTreeSet<_>>();
        Ok(children.into_iter().collect())
    }

    async fn open(&mut self, path: &str, mode: OpenMode) -> Result<MockFile> {
        let path = self.resolve(path);
        let mut state = self.server.state();
        let existing = state.files.get(&path).cloned();
        let data = match existing {
            Some(_) if mode.exclusive => {
                return Err(remote_err(&path, RemoteErrorKind::Other, "file exists"));
            }
            Some(_) if mode.truncate => Vec::new(),
            Some(data) => data,
            None if mode.create => {
                if !state.dirs.contains(&parent_of(&path)) {
                    return Err(remote_err(&path, RemoteErrorKind::NotFound, "no such file"));
                }
                Vec::new()
            }
            None => return Err(remote_err(&path, RemoteErrorKind::NotFound, "no such file")),
        };
        if mode.create || mode.truncate {
            state.files.insert(path.clone(), data.clone());
        }
        state.open_handles += 1;
        Ok(MockFile {
            server: self.server.clone(),
            path,
            data,
            pos: 0,
            writable: mode.write,
            append: mode.append,
            closed: false,
        })
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.server.state();
        state.sftp_closes += 1;
        if state.fail_sftp_close {
            return Err(remote_err("sftp", RemoteErrorKind::Other, "close failed"));
        }
        Ok(())
    }
}

/// Reads from a snapshot of the file and writes straight through to the server
pub struct MockFile {
    server: MockServer,
    path: String,
    data: Vec<u8>,
    pos: usize,
    writable: bool,
    append: bool,
    closed: bool,
}

impl AsyncRead for MockFile {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let remaining = &this.data[this.pos.min(this.data.len())..];
        let n = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockFile {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if !this.writable {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file not opened for writing",
            )));
        }
        if this.append {
            this.pos = this.data.len();
        }
        let end = this.pos + buf.len();
        if this.data.len() < end {
            this.data.resize(end, 0);
        }
        this.data[this.pos..end].copy_from_slice(buf);
        this.pos = end;
        this.server
            .state()
            .files
            .insert(this.path.clone(), this.data.clone());
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if !this.closed {
            this.closed = true;
            this.server.state().open_handles -= 1;
        }
        Poll::Ready(Ok(()))
    }
}
