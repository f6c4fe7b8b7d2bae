use std::fmt;

use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::auth::resolve_credential;
use crate::config::ConnectOptions;
use crate::engine::ssh::{RusshConnector, RusshTransport};
use crate::engine::{Connector, SftpChannel, SshTransport, Target};
use crate::error::{Error, Result};
use crate::logging::log_to_temp_file;
use crate::types::{SftpState, TransportState};

/// File handle type of a session's SFTP sub-channel
pub type RemoteFile<T> = <<T as SshTransport>::Sftp as SftpChannel>::File;

enum Link<T> {
    Connected(T),
    Closed,
}

enum SftpSlot<S> {
    Uninitialized,
    Active(S),
    Closed,
}

/// A connection to one remote host
///
/// The SSH transport is authenticated when the session is created; the SFTP
/// sub-channel is opened the first time a file operation needs it and then
/// reused. Command execution never opens it.
///
/// Close the session with [`Session::close`], or run the work inside
/// [`Session::scoped`] which closes it on every exit path. Dropping an open
/// session only schedules a best-effort close.
pub struct Session<T: SshTransport = RusshTransport> {
    host: String,
    port: u16,
    username: String,
    io_size: usize,
    transport: Link<T>,
    sftp: SftpSlot<T::Sftp>,
}

impl Session<RusshTransport> {
    /// Establishes a new SSH connection to the remote host
    ///
    /// # Arguments
    ///
    /// * `options` - Host, credential and transfer settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No password is given and no private key can be found
    /// - The key is neither an RSA nor a DSA key
    /// - The connection, host key check or authentication fails
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut session = Session::connect(
    ///     ConnectOptions::new("example.com").username("user"),
    /// ).await?;
    /// ```
    pub async fn connect(options: ConnectOptions) -> Result<Self> {
        Self::connect_with(&RusshConnector::default(), options).await
    }

    /// Connects, runs `body`, and closes the session whatever `body` returns
    ///
    /// # Example
    ///
    /// ```ignore
    /// let listing = Session::scoped(ConnectOptions::new("example.com"), |session| {
    ///     Box::pin(async move { session.listdir(None).await })
    /// })
    /// .await?;
    /// ```
    pub async fn scoped<R, F>(options: ConnectOptions, body: F) -> Result<R>
    where
        F: for<'s> FnOnce(&'s mut Session<RusshTransport>) -> BoxFuture<'s, Result<R>>,
    {
        Self::scoped_with(&RusshConnector::default(), options, body).await
    }
}

impl<T: SshTransport> Session<T> {
    /// Establishes a connection through a custom engine
    pub async fn connect_with<C>(connector: &C, options: ConnectOptions) -> Result<Self>
    where
        C: Connector<Transport = T>,
    {
        let username = options.resolved_username();
        if options.log {
            log_to_temp_file()?;
        }

        let key_dir = options.resolved_key_dir();
        let credential = resolve_credential(connector, options.auth_method(), key_dir.as_deref())?;

        info!("Connecting to {}@{}:{}", username, options.host, options.port);
        let target = Target {
            host: options.host.clone(),
            port: options.port,
            username,
        };
        let transport = connector.connect(&target, credential).await?;
        info!("Authenticated as {}", target.username);

        Ok(Self {
            host: target.host,
            port: target.port,
            username: target.username,
            io_size: options.io_size.max(1),
            transport: Link::Connected(transport),
            sftp: SftpSlot::Uninitialized,
        })
    }

    /// [`Session::scoped`] for a custom engine
    pub async fn scoped_with<C, R, F>(connector: &C, options: ConnectOptions, body: F) -> Result<R>
    where
        C: Connector<Transport = T>,
        F: for<'s> FnOnce(&'s mut Session<T>) -> BoxFuture<'s, Result<R>>,
    {
        let mut session = Self::connect_with(connector, options).await?;
        let outcome = body(&mut session).await;
        let closed = session.close().await;
        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!("Failed to close session after error: {close_err}");
                }
                Err(e)
            }
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn io_size(&self) -> usize {
        self.io_size
    }

    pub fn transport_state(&self) -> TransportState {
        match self.transport {
            Link::Connected(_) => TransportState::Connected,
            Link::Closed => TransportState::Closed,
        }
    }

    pub fn sftp_state(&self) -> SftpState {
        match self.sftp {
            SftpSlot::Uninitialized => SftpState::Uninitialized,
            SftpSlot::Active(_) => SftpState::Active,
            SftpSlot::Closed => SftpState::Closed,
        }
    }

    /// The raw transport, for operations this API does not cover
    pub fn client(&self) -> Result<&T> {
        match &self.transport {
            Link::Connected(transport) => Ok(transport),
            Link::Closed => Err(Error::Closed),
        }
    }

    pub(crate) fn transport_mut(&mut self) -> Result<&mut T> {
        match &mut self.transport {
            Link::Connected(transport) => Ok(transport),
            Link::Closed => Err(Error::Closed),
        }
    }

    /// The raw SFTP sub-channel, opened if needed
    pub async fn sftp_client(&mut self) -> Result<&mut T::Sftp> {
        self.ensure_sftp().await
    }

    /// Opens the SFTP sub-channel on first use and returns it
    pub(crate) async fn ensure_sftp(&mut self) -> Result<&mut T::Sftp> {
        if matches!(self.sftp, SftpSlot::Uninitialized) {
            debug!("Opening sftp sub-channel");
            let channel = self.transport_mut()?.open_sftp().await?;
            self.sftp = SftpSlot::Active(channel);
            debug!("sftp sub-channel ready");
        }
        match &mut self.sftp {
            SftpSlot::Active(sftp) => Ok(sftp),
            SftpSlot::Uninitialized | SftpSlot::Closed => Err(Error::Closed),
        }
    }

    /// Closes the SFTP sub-channel and then the transport
    ///
    /// Calling it again is a no-op. Both end up closed even if one of them
    /// fails to shut down cleanly; the first failure is returned.
    pub async fn close(&mut self) -> Result<()> {
        let mut first_err = None;

        if let SftpSlot::Active(mut sftp) = std::mem::replace(&mut self.sftp, SftpSlot::Closed) {
            debug!("Closing sftp sub-channel");
            if let Err(e) = sftp.close().await {
                first_err = Some(e);
            }
        }

        if let Link::Connected(mut transport) = std::mem::replace(&mut self.transport, Link::Closed) {
            info!("Closing connection to {}:{}", self.host, self.port);
            if let Err(e) = transport.close().await {
                if first_err.is_some() {
                    warn!("Failed to close transport: {e}");
                } else {
                    first_err = Some(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<T: SshTransport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("transport", &self.transport_state())
            .field("sftp", &self.sftp_state())
            .finish()
    }
}

impl<T: SshTransport> Drop for Session<T> {
    fn drop(&mut self) {
        let sftp = match std::mem::replace(&mut self.sftp, SftpSlot::Closed) {
            SftpSlot::Active(sftp) => Some(sftp),
            SftpSlot::Uninitialized | SftpSlot::Closed => None,
        };
        let transport = match std::mem::replace(&mut self.transport, Link::Closed) {
            Link::Connected(transport) => transport,
            Link::Closed => return,
        };

        warn!(
            "Session to {}:{} dropped without close; closing in background",
            self.host, self.port
        );
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    let mut transport = transport;
                    if let Some(mut sftp) = sftp {
                        if let Err(e) = sftp.close().await {
                            debug!("Background sftp close failed: {e}");
                        }
                    }
                    if let Err(e) = transport.close().await {
                        debug!("Background transport close failed: {e}");
                    }
                });
            }
            Err(_) => debug!("No tokio runtime; releasing transport without disconnect"),
        }
    }
}
