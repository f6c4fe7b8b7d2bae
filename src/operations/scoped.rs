use futures::future::BoxFuture;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::engine::{SftpChannel, SshTransport};
use crate::error::{Error, Result};
use crate::operations::list;
use crate::session::{RemoteFile, Session};
use crate::types::OpenMode;

/// Keeps the body's error when both the body and the cleanup fail.
fn settle<R>(outcome: Result<R>, cleanup: Result<()>, what: &str) -> Result<R> {
    match (outcome, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_err)) => {
            warn!("Failed to {what} after error: {cleanup_err}");
            Err(e)
        }
    }
}

/// Runs `body` with the remote working directory set to `remote_dir`, then
/// restores the directory that was current on entry, whatever `body` returns.
pub async fn cd<T, R, F>(session: &mut Session<T>, remote_dir: &str, body: F) -> Result<R>
where
    T: SshTransport,
    F: for<'s> FnOnce(&'s mut Session<T>) -> BoxFuture<'s, Result<R>>,
{
    let previous = list::getcwd(session).await?;
    list::chdir(session, remote_dir).await?;

    let outcome = body(session).await;

    debug!("Restoring remote working directory {:?}", previous);
    let restored = list::set_cwd(session, previous.as_deref()).await;
    settle(outcome, restored, "restore the working directory")
}

/// Opens a remote file for the duration of `body` and closes it afterwards,
/// whatever `body` returns.
pub async fn open<T, R, F>(
    session: &mut Session<T>,
    remote_path: &str,
    mode: OpenMode,
    body: F,
) -> Result<R>
where
    T: SshTransport,
    F: for<'f> FnOnce(&'f mut RemoteFile<T>) -> BoxFuture<'f, Result<R>>,
{
    let mut file = session.ensure_sftp().await?.open(remote_path, mode).await?;
    debug!("Opened {:?} with mode {}", remote_path, mode);

    let outcome = body(&mut file).await;

    let closed = file
        .shutdown()
        .await
        .map_err(|e| Error::remote(remote_path, e));
    settle(outcome, closed, "close the remote file")
}
