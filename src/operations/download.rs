use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{error, info, warn};

use crate::engine::{SftpChannel, SshTransport};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::types::{FileTransfer, OpenMode};
use crate::utils::local_name_for;

/// Downloads a file from the remote server to local storage
///
/// Reads the remote file in `io_size` chunks and writes them to the local
/// file in order. The local parent directory must already exist.
///
/// # Arguments
///
/// * `session` - The session to download through
/// * `remote_path` - Path to the remote file to download
/// * `local_path` - Local destination; the remote file name in the current
///   directory when `None`
///
/// # Errors
///
/// Returns an error if:
/// - The remote file cannot be opened or read (`RemoteIo`)
/// - The local file cannot be created or written to (`LocalIo`)
pub async fn get<T: SshTransport>(
    session: &mut Session<T>,
    remote_path: &str,
    local_path: Option<&Path>,
) -> Result<FileTransfer> {
    let local_path: PathBuf = match local_path {
        Some(path) => path.to_path_buf(),
        None => local_name_for(remote_path),
    };
    let io_size = session.io_size();
    let download_time = Instant::now();

    let sftp = session.ensure_sftp().await?;
    let mut remote_file = sftp.open(remote_path, OpenMode::read()).await?;
    info!("Remote file opened: {:?}", remote_path);

    let mut local_file = match fs::File::create(&local_path).await {
        Ok(file) => file,
        Err(e) => {
            if let Err(close_err) = remote_file.shutdown().await {
                warn!("Failed to close remote file {:?}: {:?}", remote_path, close_err);
            }
            return Err(e.into());
        }
    };
    info!("Local file created: {:?}", local_path);

    let mut buffer = vec![0; io_size];
    let mut copied: u64 = 0;
    let mut download_error: Option<Error> = None;
    loop {
        let bytes_read = match remote_file.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                error!("Error reading remote file: {:?}", e);
                download_error = Some(Error::remote(remote_path, e));
                break;
            }
        };
        if let Err(e) = local_file.write_all(&buffer[..bytes_read]).await {
            download_error = Some(e.into());
            break;
        }
        copied += bytes_read as u64;
    }

    if let Err(e) = remote_file.shutdown().await {
        warn!("Failed to close remote file {:?}: {:?}", remote_path, e);
    }
    if let Some(err) = download_error {
        return Err(err);
    }
    local_file.flush().await?;

    info!(
        "File {:?} downloaded. Time taken {:?}",
        remote_path,
        download_time.elapsed(),
    );

    Ok(FileTransfer {
        src_file: remote_path.to_string(),
        dest_file: local_path.to_string_lossy().into_owned(),
        file_size: copied,
    })
}
