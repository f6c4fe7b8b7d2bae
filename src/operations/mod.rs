/// Module for downloading files from remote server
pub(crate) mod download;

/// Module for running commands on the remote host
pub(crate) mod execute;

/// Module for listing and navigating remote directories
pub(crate) mod list;

/// Module for creating remote directories
pub(crate) mod mkdir;

/// Module for the scoped `cd` and `open` helpers
pub(crate) mod scoped;

/// Module for stat based checks
pub(crate) mod stat;

/// Module for uploading files to remote server
pub(crate) mod upload;
