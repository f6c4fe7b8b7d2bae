use std::path::Path;

use tracing::{debug, info};

use crate::engine::{SftpChannel, SshTransport};
use crate::error::{Error, RemoteErrorKind, Result};
use crate::operations::{stat, upload};
use crate::session::Session;
use crate::types::FileTransfer;
use crate::utils::{posix_parent, remote_name_for};

/// Deepest chain of missing directories `mkdir_all` will create
const MAX_DIR_DEPTH: usize = 64;

pub async fn mkdir<T: SshTransport>(session: &mut Session<T>, remote_path: &str) -> Result<()> {
    session.ensure_sftp().await?.mkdir(remote_path).await
}

/// Creates `remote_path` and any missing ancestors.
///
/// Walks up from `remote_path` until a directory exists or `mkdir` succeeds,
/// then creates the remembered descendants top-down. Each step moves to a
/// strictly shorter POSIX parent; the walk ends at the root, at an empty
/// parent, or after [`MAX_DIR_DEPTH`] levels. Trailing slashes are ignored.
pub async fn mkdir_all<T: SshTransport>(session: &mut Session<T>, remote_path: &str) -> Result<()> {
    let mut pending: Vec<String> = Vec::new();
    let mut current = trim_trailing_slashes(remote_path).to_string();

    loop {
        if stat::exists(session, &current).await? {
            break;
        }
        match mkdir(session, &current).await {
            Ok(()) => {
                debug!("Created remote directory {:?}", current);
                break;
            }
            Err(e) => {
                let parent = posix_parent(&current);
                if parent.is_empty() || parent.len() >= current.len() {
                    return Err(e);
                }
                if pending.len() >= MAX_DIR_DEPTH {
                    return Err(Error::RemoteIo {
                        path: remote_path.to_string(),
                        kind: RemoteErrorKind::Other,
                        message: format!("more than {MAX_DIR_DEPTH} missing directory levels"),
                    });
                }
                debug!("Could not create {:?} ({e}); ensuring {:?}", current, parent);
                let parent = parent.to_string();
                pending.push(std::mem::replace(&mut current, parent));
            }
        }
    }

    while let Some(dir) = pending.pop() {
        if let Err(e) = mkdir(session, &dir).await {
            // Created concurrently, or by another spelling of the same path
            if !stat::exists(session, &dir).await? {
                return Err(e);
            }
            debug!("{:?} already exists ({e})", dir);
            continue;
        }
        debug!("Created remote directory {:?}", dir);
    }
    Ok(())
}

fn trim_trailing_slashes(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

/// Uploads a file, creating the remote parent directories first
pub async fn mkdir_put<T: SshTransport>(
    session: &mut Session<T>,
    local_path: &Path,
    remote_path: Option<&str>,
) -> Result<FileTransfer> {
    let remote_path = match remote_path {
        Some(path) => path.to_string(),
        None => remote_name_for(local_path),
    };
    let parent = posix_parent(&remote_path);
    if !parent.is_empty() {
        info!("Ensuring remote directory {:?}", parent);
        mkdir_all(session, parent).await?;
    }
    upload::put(session, local_path, Some(&remote_path)).await
}
