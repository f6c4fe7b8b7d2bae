use std::path::{Path, PathBuf};

/// Parent of a remote path, split on `/` regardless of the local platform.
///
/// Mirrors `posixpath.split(path)[0]`: trailing slashes of the head are
/// stripped unless the head is made only of slashes.
pub fn posix_parent(path: &str) -> &str {
    match path.rfind('/') {
        None => "",
        Some(idx) => {
            let head = &path[..=idx];
            let trimmed = head.trim_end_matches('/');
            if trimmed.is_empty() { head } else { trimmed }
        }
    }
}

/// Final segment of a remote path (empty when the path ends with `/`)
pub fn posix_file_name(path: &str) -> &str {
    match path.rfind('/') {
        None => path,
        Some(idx) => &path[idx + 1..],
    }
}

/// Joins `path` onto `base` and removes `.`/`..` segments.
///
/// Absolute paths ignore `base`; relative paths without a base stay relative.
pub fn join_remote(base: Option<&str>, path: &str) -> String {
    let joined = match base {
        Some(base) if !path.starts_with('/') => format!("{}/{}", base.trim_end_matches('/'), path),
        _ => path.to_string(),
    };
    normalize_remote(&joined)
}

/// Lexically normalizes a POSIX path
pub fn normalize_remote(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let body = parts.join("/");
    match (absolute, body.is_empty()) {
        (true, _) => format!("/{body}"),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}

/// Local destination for a download when the caller gave none: the remote
/// file name, placed in the current local directory.
pub fn local_name_for(remote_path: &str) -> PathBuf {
    PathBuf::from(posix_file_name(remote_path))
}

/// Remote destination for an upload when the caller gave none: the local
/// file name, relative to the remote working directory.
pub fn remote_name_for(local_path: &Path) -> String {
    local_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Expands a leading `~` to the given home directory
pub fn expand_tilde(path: &Path, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return path.to_path_buf();
    };
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}
