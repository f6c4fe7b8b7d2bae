use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::engine::{Connector, Credential, KeyFormat};
use crate::error::{Error, Result};
use crate::utils::expand_tilde;

/// Key files probed, in order, when no password and no key path is given
const DEFAULT_KEY_NAMES: [&str; 2] = ["id_rsa", "id_dsa"];

/// The single credential a session authenticates with
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    Password(String),
    PrivateKey {
        /// Key file; the default keys are probed when `None`
        path: Option<PathBuf>,
        passphrase: Option<String>,
    },
}

impl AuthMethod {
    /// Picks the credential from loosely specified parts: a non-empty
    /// password always wins over key material.
    pub fn from_parts(
        password: Option<String>,
        private_key: Option<PathBuf>,
        passphrase: Option<String>,
    ) -> Self {
        match password {
            Some(password) if !password.is_empty() => AuthMethod::Password(password),
            _ => AuthMethod::PrivateKey {
                path: private_key,
                passphrase,
            },
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Password(_) => f.write_str("Password(<redacted>)"),
            AuthMethod::PrivateKey { path, passphrase } => f
                .debug_struct("PrivateKey")
                .field("path", path)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

/// Finds the key file to use: the supplied path (with `~` expanded), else the
/// first of `id_rsa`, `id_dsa` present in `key_dir`.
pub(crate) fn resolve_key_path(explicit: Option<&Path>, key_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand_tilde(path, dirs::home_dir().as_deref()));
    }
    key_dir
        .into_iter()
        .flat_map(|dir| DEFAULT_KEY_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| Error::Configuration("no password or key specified".to_string()))
}

/// Loads a key as RSA, falling back to DSA when the file is not an RSA key.
pub(crate) fn load_private_key<C: Connector>(
    connector: &C,
    path: &Path,
    passphrase: Option<&str>,
) -> Result<C::Key> {
    match connector.load_key(path, passphrase, KeyFormat::Rsa) {
        Err(Error::KeyFormat { reason, .. }) => {
            debug!("{} is not an RSA key ({reason}); trying DSA", path.display());
            connector.load_key(path, passphrase, KeyFormat::Dsa)
        }
        other => other,
    }
}

/// Turns the configured method into a credential the engine can use.
///
/// Only local work happens here, so a missing credential is reported before
/// any connection is attempted.
pub(crate) fn resolve_credential<C: Connector>(
    connector: &C,
    method: AuthMethod,
    key_dir: Option<&Path>,
) -> Result<Credential<C::Key>> {
    match method {
        AuthMethod::Password(password) => Ok(Credential::Password(password)),
        AuthMethod::PrivateKey { path, passphrase } => {
            let path = resolve_key_path(path.as_deref(), key_dir)?;
            debug!("Using private key {}", path.display());
            let key = load_private_key(connector, &path, passphrase.as_deref())?;
            Ok(Credential::Key(key))
        }
    }
}
