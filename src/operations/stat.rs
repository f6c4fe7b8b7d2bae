use std::path::Path;

use tokio::fs;
use tracing::debug;

use crate::engine::{SftpChannel, SshTransport};
use crate::error::Result;
use crate::session::Session;
use crate::types::FileMetadata;
use crate::utils::local_name_for;

pub async fn stat<T: SshTransport>(session: &mut Session<T>, remote_path: &str) -> Result<FileMetadata> {
    session.ensure_sftp().await?.stat(remote_path).await
}

/// True if the remote path can be stat'ed, false if it does not exist.
///
/// Every other failure, permission denied included, is returned as an error.
pub async fn exists<T: SshTransport>(session: &mut Session<T>, remote_path: &str) -> Result<bool> {
    match stat(session, remote_path).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Compares the size of a local file with a remote one.
///
/// The local file must exist: a failed local stat is an error, whereas a
/// missing remote file just yields `false`.
pub async fn size_match<T: SshTransport>(
    session: &mut Session<T>,
    remote_path: &str,
    local_path: Option<&Path>,
) -> Result<bool> {
    let local_size = match local_path {
        Some(path) => fs::metadata(path).await?.len(),
        None => fs::metadata(local_name_for(remote_path)).await?.len(),
    };
    match stat(session, remote_path).await {
        Ok(remote) => {
            debug!(
                "Comparing sizes of {:?}: local {} remote {:?}",
                remote_path, local_size, remote.size
            );
            Ok(remote.size == Some(local_size))
        }
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}
