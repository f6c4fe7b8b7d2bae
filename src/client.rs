use std::path::Path;

use futures::future::BoxFuture;

use crate::engine::SshTransport;
use crate::error::Result;
use crate::operations::{download, execute, list, mkdir, scoped, stat, upload};
use crate::session::{RemoteFile, Session};
use crate::types::{CommandOutput, FileMetadata, FileTransfer, OpenMode};

impl<T: SshTransport> Session<T> {
    /// Downloads a file from the remote server to local storage
    ///
    /// # Arguments
    ///
    /// * `remote_path` - Path to the remote file
    /// * `local_path` - Local destination; the remote file name in the current
    ///   local directory when `None`
    ///
    /// # Example
    ///
    /// ```ignore
    /// session.get("/var/log/syslog", Some(Path::new("/tmp/syslog"))).await?;
    /// ```
    pub async fn get(&mut self, remote_path: &str, local_path: Option<&Path>) -> Result<FileTransfer> {
        download::get(self, remote_path, local_path).await
    }

    /// Uploads a local file to the remote server
    ///
    /// # Arguments
    ///
    /// * `local_path` - Path to the local file
    /// * `remote_path` - Destination on the remote server; the local file name
    ///   in the remote working directory when `None`
    ///
    /// # Example
    ///
    /// ```ignore
    /// session.put(Path::new("report.pdf"), Some("/srv/reports/report.pdf")).await?;
    /// ```
    pub async fn put(&mut self, local_path: &Path, remote_path: Option<&str>) -> Result<FileTransfer> {
        upload::put(self, local_path, remote_path).await
    }

    /// Metadata of a remote path
    pub async fn stat(&mut self, remote_path: &str) -> Result<FileMetadata> {
        stat::stat(self, remote_path).await
    }

    /// Whether a remote path exists
    ///
    /// Returns `Ok(false)` only for "no such file"; other stat failures are
    /// errors.
    pub async fn exists(&mut self, remote_path: &str) -> Result<bool> {
        stat::exists(self, remote_path).await
    }

    /// Whether the remote file has the same size as the local one
    ///
    /// `local_path` defaults to the remote file name in the current local
    /// directory. A missing local file is an error; a missing remote file
    /// gives `Ok(false)`.
    pub async fn size_match(&mut self, remote_path: &str, local_path: Option<&Path>) -> Result<bool> {
        stat::size_match(self, remote_path, local_path).await
    }

    /// Creates one remote directory; its parent must exist
    pub async fn mkdir(&mut self, remote_path: &str) -> Result<()> {
        mkdir::mkdir(self, remote_path).await
    }

    /// Creates a remote directory along with any missing parents
    pub async fn mkdir_all(&mut self, remote_path: &str) -> Result<()> {
        mkdir::mkdir_all(self, remote_path).await
    }

    /// Uploads a file after creating its remote parent directories
    ///
    /// # Example
    ///
    /// ```ignore
    /// session.mkdir_put(Path::new("local/a/b.txt"), Some("remote/x/y/b.txt")).await?;
    /// ```
    pub async fn mkdir_put(&mut self, local_path: &Path, remote_path: Option<&str>) -> Result<FileTransfer> {
        mkdir::mkdir_put(self, local_path, remote_path).await
    }

    /// Runs a command and returns its output lines
    ///
    /// Standard output is returned when the command printed anything there,
    /// standard error otherwise. The exit status is ignored; use
    /// [`Session::execute_output`] to inspect it.
    pub async fn execute(&mut self, command: &str) -> Result<Vec<String>> {
        execute::execute(self, command).await
    }

    /// Runs a command and returns stdout, stderr and the exit status
    pub async fn execute_output(&mut self, command: &str) -> Result<CommandOutput> {
        execute::execute_output(self, command).await
    }

    pub async fn chdir(&mut self, remote_dir: &str) -> Result<()> {
        list::chdir(self, remote_dir).await
    }

    /// The remote working directory, `None` until [`Session::chdir`] is used
    pub async fn getcwd(&mut self) -> Result<Option<String>> {
        list::getcwd(self).await
    }

    /// Names in a remote directory, the working directory when `None`
    pub async fn listdir(&mut self, remote_dir: Option<&str>) -> Result<Vec<String>> {
        list::listdir(self, remote_dir).await
    }

    /// Runs `body` inside `remote_dir` and then changes back
    ///
    /// The previous working directory is restored on every exit path,
    /// including when `body` fails. Scopes nest.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let names = session
    ///     .cd("/var/www", |s| Box::pin(async move { s.listdir(None).await }))
    ///     .await?;
    /// ```
    pub async fn cd<R, F>(&mut self, remote_dir: &str, body: F) -> Result<R>
    where
        F: for<'s> FnOnce(&'s mut Session<T>) -> BoxFuture<'s, Result<R>>,
    {
        scoped::cd(self, remote_dir, body).await
    }

    /// Opens a remote file for the duration of `body`
    ///
    /// The handle is closed on every exit path.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut text = String::new();
    /// session
    ///     .open("/etc/hostname", OpenMode::read(), |file| {
    ///         Box::pin(async move {
    ///             file.read_to_string(&mut text).await.map_err(|e| Error::remote("/etc/hostname", e))?;
    ///             Ok(())
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn open<R, F>(&mut self, remote_path: &str, mode: OpenMode, body: F) -> Result<R>
    where
        F: for<'f> FnOnce(&'f mut RemoteFile<T>) -> BoxFuture<'f, Result<R>>,
    {
        scoped::open(self, remote_path, mode, body).await
    }
}
