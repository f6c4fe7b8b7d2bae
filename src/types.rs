use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::error::Error;

/// Metadata information for a remote path
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub path: String,
    pub size: Option<u64>,
    pub file_type: FileType,
    pub permissions: Option<u32>,
    pub last_accessed_at: Option<SystemTime>,
    pub last_modified_at: Option<SystemTime>,
}

impl FileMetadata {
    /// Builds metadata from raw SFTP attributes (POSIX mode bits and unix timestamps)
    pub fn from_attrs(
        path: impl Into<String>,
        size: Option<u64>,
        permissions: Option<u32>,
        atime: Option<u32>,
        mtime: Option<u32>,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            file_type: permissions.map(FileType::from_mode).unwrap_or(FileType::Other),
            permissions,
            last_accessed_at: atime.map(unix_time),
            last_modified_at: mtime.map(unix_time),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}

fn unix_time(secs: u32) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(u64::from(secs))
}

/// Type of a remote file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    Other,
}

impl FileType {
    const S_IFMT: u32 = 0o170000;
    const S_IFDIR: u32 = 0o040000;
    const S_IFREG: u32 = 0o100000;
    const S_IFLNK: u32 = 0o120000;

    /// Decodes the file type bits of a POSIX mode
    pub fn from_mode(mode: u32) -> Self {
        match mode & Self::S_IFMT {
            Self::S_IFDIR => FileType::Directory,
            Self::S_IFREG => FileType::Regular,
            Self::S_IFLNK => FileType::Symlink,
            _ => FileType::Other,
        }
    }
}

/// Summary of a completed whole-file transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransfer {
    /// Source file path
    pub src_file: String,
    /// Destination file path
    pub dest_file: String,
    /// Number of bytes copied
    pub file_size: u64,
}

/// Raw result of a remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Bytes,
    pub stderr: Bytes,
    /// Exit status, when the server reported one
    pub exit_status: Option<u32>,
}

impl CommandOutput {
    /// Lines of standard output, or of standard error when standard output is empty.
    pub fn lines(&self) -> Vec<String> {
        let chosen = if self.stdout.is_empty() {
            &self.stderr
        } else {
            &self.stdout
        };
        String::from_utf8_lossy(chosen)
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

/// State of the underlying SSH transport
///
/// There is no "not connected" state: a [`Session`](crate::Session) only
/// exists once its transport has been authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Connected,
    Closed,
}

/// State of the lazily opened SFTP sub-channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SftpState {
    Uninitialized,
    Active,
    Closed,
}

/// How a remote file is opened
///
/// Parses the familiar `fopen`-style mode strings: `r`, `w`, `a`, `x`, each
/// optionally followed by `+`, with `b` and `t` accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub create: bool,
    pub truncate: bool,
    pub exclusive: bool,
}

impl OpenMode {
    pub const fn read() -> Self {
        Self {
            read: true,
            write: false,
            append: false,
            create: false,
            truncate: false,
            exclusive: false,
        }
    }

    /// Create or truncate for writing
    pub const fn write() -> Self {
        Self {
            read: false,
            write: true,
            append: false,
            create: true,
            truncate: true,
            exclusive: false,
        }
    }

    pub const fn append() -> Self {
        Self {
            read: false,
            write: true,
            append: true,
            create: true,
            truncate: false,
            exclusive: false,
        }
    }
}

impl Default for OpenMode {
    fn default() -> Self {
        Self::read()
    }
}

impl FromStr for OpenMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidOpenMode(s.to_string());
        let flags: String = s.chars().filter(|c| !matches!(c, 'b' | 't')).collect();
        let (base, plus) = match flags.strip_suffix('+') {
            Some(base) => (base, true),
            None => (flags.as_str(), false),
        };
        let mut mode = match base {
            "r" => Self::read(),
            "w" => Self::write(),
            "a" => Self::append(),
            "x" => Self {
                exclusive: true,
                ..Self::write()
            },
            _ => return Err(invalid()),
        };
        if plus {
            mode.read = true;
            mode.write = true;
        }
        Ok(mode)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match (self.exclusive, self.append, self.truncate, self.write) {
            (true, _, _, _) => "x",
            (_, true, _, _) => "a",
            (_, _, true, _) => "w",
            (_, _, _, true) if !self.read => "w",
            _ => "r",
        };
        let plus = self.read && self.write;
        write!(f, "{base}{}", if plus { "+" } else { "" })
    }
}
