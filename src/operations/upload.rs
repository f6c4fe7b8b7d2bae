use std::path::Path;
use std::time::Instant;

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{error, info, warn};

use crate::engine::{SftpChannel, SshTransport};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::types::{FileTransfer, OpenMode};
use crate::utils::remote_name_for;

/// Uploads a local file to the remote server
///
/// Reads the local file in `io_size` chunks and writes them to a remote
/// file that is created or truncated. Missing remote parent directories are
/// not created; see [`Session::mkdir_put`].
///
/// # Arguments
///
/// * `session` - The session to upload through
/// * `local_path` - Path to the local file to upload
/// * `remote_path` - Destination; the local file name relative to the remote
///   working directory when `None`
///
/// # Errors
///
/// Returns an error if:
/// - The local file cannot be opened or read (`LocalIo`)
/// - The remote file cannot be created or written to (`RemoteIo`)
pub async fn put<T: SshTransport>(
    session: &mut Session<T>,
    local_path: &Path,
    remote_path: Option<&str>,
) -> Result<FileTransfer> {
    let remote_path = match remote_path {
        Some(path) => path.to_string(),
        None => remote_name_for(local_path),
    };
    let io_size = session.io_size();
    let upload_time = Instant::now();

    let mut local_file = fs::File::open(local_path).await?;
    info!("Local file opened: {:?}", local_path);

    let sftp = session.ensure_sftp().await?;
    let mut remote_file = sftp.open(&remote_path, OpenMode::write()).await.map_err(|err| {
        info!("Failed to open file: {:?} ERROR: {:?}", remote_path, err);
        err
    })?;
    info!("Remote file created path: {:?}", remote_path);

    let mut buffer = vec![0; io_size];
    let mut copied: u64 = 0;
    let mut upload_error: Option<Error> = None;
    loop {
        let bytes_read = match local_file.read(&mut buffer).await {
            Ok(0) => {
                info!("Upload: End of file reached");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                error!("Error reading local file: {:?}", e);
                upload_error = Some(e.into());
                break;
            }
        };
        if let Err(e) = remote_file.write_all(&buffer[..bytes_read]).await {
            upload_error = Some(Error::remote(&remote_path, e));
            break;
        }
        copied += bytes_read as u64;
    }

    if let Some(err) = upload_error {
        if let Err(e) = remote_file.shutdown().await {
            warn!("Failed to close remote file {:?}: {:?}", remote_path, e);
        }
        return Err(err);
    }
    remote_file
        .shutdown()
        .await
        .map_err(|e| Error::remote(&remote_path, e))?;

    info!(
        "File {:?} uploaded. Time taken {:?}",
        local_path,
        upload_time.elapsed(),
    );

    Ok(FileTransfer {
        src_file: local_path.to_string_lossy().into_owned(),
        dest_file: remote_path,
        file_size: copied,
    })
}
