use tracing::debug;

use crate::engine::{SftpChannel, SshTransport};
use crate::error::Result;
use crate::session::Session;

/// Lists the entry names of a remote directory
///
/// # Arguments
///
/// * `session` - The session to list through
/// * `remote_dir` - Path to the remote directory, the working directory when `None`
///
/// # Returns
///
/// The names in the directory, without `.` and `..`
pub async fn listdir<T: SshTransport>(
    session: &mut Session<T>,
    remote_dir: Option<&str>,
) -> Result<Vec<String>> {
    let remote_dir = remote_dir.unwrap_or(".");
    let names = session.ensure_sftp().await?.listdir(remote_dir).await?;
    debug!("Listed {} entries in {:?}", names.len(), remote_dir);
    Ok(names)
}

pub async fn chdir<T: SshTransport>(session: &mut Session<T>, remote_dir: &str) -> Result<()> {
    set_cwd(session, Some(remote_dir)).await
}

/// Sets the remote working directory; `None` returns to the server default
pub(crate) async fn set_cwd<T: SshTransport>(
    session: &mut Session<T>,
    remote_dir: Option<&str>,
) -> Result<()> {
    session.ensure_sftp().await?.chdir(remote_dir).await?;
    debug!("Remote working directory is now {:?}", remote_dir);
    Ok(())
}

pub async fn getcwd<T: SshTransport>(session: &mut Session<T>) -> Result<Option<String>> {
    Ok(session.ensure_sftp().await?.getcwd())
}
