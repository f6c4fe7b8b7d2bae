use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::auth::AuthMethod;
use crate::error::{Error, Result};

const DEFAULT_PORT: u16 = 22;
const DEFAULT_IO_SIZE: usize = 65536;

/// Everything needed to open a [`Session`](crate::Session)
///
/// Only `host` is required. Fields can be set with the builder methods or
/// deserialized from JSON:
///
/// ```
/// use simple_sftp::ConnectOptions;
///
/// let options = ConnectOptions::from_json(r#"{ "host": "example.com", "password": "s3cret" }"#)?;
/// assert_eq!(options.port, 22);
/// # Ok::<(), simple_sftp::Error>(())
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// Hostname or IP address of the remote machine
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Remote username; the local login name when unset
    #[serde(default)]
    pub username: Option<String>,
    /// Password; takes priority over any private key
    #[serde(default)]
    pub password: Option<String>,
    /// Private key file; `~/.ssh/id_rsa` then `~/.ssh/id_dsa` are probed when unset
    #[serde(default)]
    pub private_key: Option<PathBuf>,
    /// Passphrase for an encrypted private key
    #[serde(default)]
    pub private_key_pass: Option<String>,
    /// Write connection diagnostics to a temporary `ssh-*.txt` file
    #[serde(default)]
    pub log: bool,
    /// Directory probed for default keys instead of `~/.ssh`
    #[serde(default)]
    pub key_dir: Option<PathBuf>,
    /// Buffer size for get/put in bytes
    #[serde(default = "default_io_size")]
    pub io_size: usize,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_io_size() -> usize {
    DEFAULT_IO_SIZE
}

impl ConnectOptions {
    /// Creates options for `host` with default values
    /// - port: 22
    /// - io_size: 65536 (64KB)
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            private_key: None,
            private_key_pass: None,
            log: false,
            key_dir: None,
            io_size: DEFAULT_IO_SIZE,
        }
    }

    /// Parses options from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Configuration(format!("invalid connection options: {e}")))
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn private_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key = Some(path.into());
        self
    }

    pub fn private_key_pass(mut self, passphrase: impl Into<String>) -> Self {
        self.private_key_pass = Some(passphrase.into());
        self
    }

    pub fn log(mut self, enabled: bool) -> Self {
        self.log = enabled;
        self
    }

    pub fn key_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.key_dir = Some(dir.into());
        self
    }

    pub fn io_size(mut self, io_size: usize) -> Self {
        self.io_size = io_size;
        self
    }

    /// The credential these options select
    pub fn auth_method(&self) -> AuthMethod {
        AuthMethod::from_parts(
            self.password.clone(),
            self.private_key.clone(),
            self.private_key_pass.clone(),
        )
    }

    /// The username to log in as, falling back to the local login name
    pub fn resolved_username(&self) -> String {
        match &self.username {
            Some(name) if !name.is_empty() => name.clone(),
            _ => local_login_name(),
        }
    }

    /// Directory probed for `id_rsa` / `id_dsa`
    pub(crate) fn resolved_key_dir(&self) -> Option<PathBuf> {
        self.key_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".ssh")))
    }
}

fn local_login_name() -> String {
    std::env::var("LOGNAME")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(whoami::username)
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("private_key", &self.private_key)
            .field(
                "private_key_pass",
                &self.private_key_pass.as_ref().map(|_| "<redacted>"),
            )
            .field("log", &self.log)
            .field("key_dir", &self.key_dir)
            .field("io_size", &self.io_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fills_in_defaults() {
        let options = ConnectOptions::from_json(r#"{ "host": "files.example.com" }"#).unwrap();
        assert_eq!(options.host, "files.example.com");
        assert_eq!(options.port, 22);
        assert_eq!(options.io_size, 65536);
        assert!(!options.log);
        assert!(options.password.is_none());
    }

    #[test]
    fn json_without_host_is_a_configuration_error() {
        let err = ConnectOptions::from_json(r#"{ "port": 2222 }"#).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn builder_round_trips_through_json() {
        let options = ConnectOptions::new("10.0.0.5")
            .port(2222)
            .username("deploy")
            .private_key("~/.ssh/deploy_rsa")
            .log(true);
        let json = serde_json::to_string(&options).unwrap();
        let parsed = ConnectOptions::from_json(&json).unwrap();
        assert_eq!(parsed.port, 2222);
        assert_eq!(parsed.username.as_deref(), Some("deploy"));
        assert_eq!(parsed.private_key, Some(PathBuf::from("~/.ssh/deploy_rsa")));
        assert!(parsed.log);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let options = ConnectOptions::new("h")
            .password("hunter2")
            .private_key_pass("open sesame");
        let rendered = format!("{options:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("open sesame"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn explicit_username_wins_over_login_name() {
        let options = ConnectOptions::new("h").username("alice");
        assert_eq!(options.resolved_username(), "alice");
    }

    #[test]
    fn missing_username_falls_back_to_local_login() {
        assert!(!ConnectOptions::new("h").resolved_username().is_empty());
    }

    #[test]
    fn explicit_key_dir_overrides_home() {
        let options = ConnectOptions::new("h").key_dir("/opt/keys");
        assert_eq!(options.resolved_key_dir(), Some(PathBuf::from("/opt/keys")));
    }
}
