use crate::error::FileCheckError;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Prefix of paths embedded in the application rather than on disk.
pub const RESOURCE_PREFIX: &str = ":/";

/// Turns a `file://` URL into a plain path. Anything else passes through.
pub fn url_to_path(url: &str) -> &str {
    url.strip_prefix("file://").unwrap_or(url)
}

/// Validates a file the UI wants to load: it must exist and not exceed
/// `max_bytes`. Embedded resources are accepted as is.
pub fn check_file(url: &str, max_bytes: u64) -> Result<PathBuf, FileCheckError> {
    let path = url_to_path(url);
    if path.starts_with(RESOURCE_PREFIX) {
        return Ok(PathBuf::from(path));
    }

    let path = PathBuf::from(path);
    let metadata = match fs::metadata(&path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(FileCheckError::NotFound(path)),
        Err(e) => return Err(e.into()),
    };

    if metadata.len() > max_bytes {
        return Err(FileCheckError::TooLarge { path, size: metadata.len(), max_bytes });
    }
    Ok(path)
}
