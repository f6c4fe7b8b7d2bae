use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{Level, warn};

use crate::error::Result;

/// Sends diagnostic logs to a new `ssh-*.txt` file in the temp directory.
///
/// The file outlives the process. If a global subscriber is already
/// installed, the file is still created but stays empty.
pub(crate) fn log_to_temp_file() -> Result<PathBuf> {
    let (file, path) = tempfile::Builder::new()
        .prefix("ssh-")
        .suffix(".txt")
        .tempfile()?
        .keep()
        .map_err(|e| e.error)?;

    let installed = tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(Level::DEBUG)
        .try_init();
    if let Err(e) = installed {
        warn!(
            "Could not attach diagnostic log {}: {e}",
            path.display()
        );
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_uniquely_named_and_kept() {
        let first = log_to_temp_file().unwrap();
        let second = log_to_temp_file().unwrap();
        assert_ne!(first, second);
        for path in [&first, &second] {
            let name = path.file_name().unwrap().to_string_lossy();
            assert!(name.starts_with("ssh-") && name.ends_with(".txt"), "{name}");
            assert!(path.exists());
        }
        let _ = std::fs::remove_file(first);
        let _ = std::fs::remove_file(second);
    }
}
