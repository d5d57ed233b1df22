//! Node path validation and manipulation.
//!
//! Paths are absolute, `/`-separated, and never end in a separator (except the
//! tree root `/` itself). Validation is explicit so callers never rely on
//! string concatenation to produce a well-formed path.

use crate::constants::MAX_PATH_SIZE;
use crate::error::CoordinationError;

/// Path of the tree root.
pub const ROOT_PATH: &str = "/";

/// Path separator.
pub const SEPARATOR: char = '/';

/// Validate a node path.
///
/// # Errors
///
/// Returns [`CoordinationError::InvalidPath`] if the path is empty, relative,
/// ends in a separator, contains empty, `.` or `..` segments, contains NUL,
/// or exceeds [`MAX_PATH_SIZE`].
pub fn validate_path(path: &str) -> Result<(), CoordinationError> {
    let invalid = |reason: &str| CoordinationError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if path.is_empty() {
        return Err(invalid("path is empty"));
    }
    if path.len() > MAX_PATH_SIZE as usize {
        return Err(invalid("path exceeds maximum length"));
    }
    if !path.starts_with(SEPARATOR) {
        return Err(invalid("path must be absolute"));
    }
    if path == ROOT_PATH {
        return Ok(());
    }
    if path.ends_with(SEPARATOR) {
        return Err(invalid("path must not end with '/'"));
    }
    if path.contains('\0') {
        return Err(invalid("path contains NUL"));
    }
    for segment in path[1..].split(SEPARATOR) {
        match segment {
            "" => return Err(invalid("path contains an empty segment")),
            "." | ".." => return Err(invalid("relative segments are not allowed")),
            _ => {}
        }
    }
    Ok(())
}

/// Validate a single child name (no separators).
pub fn validate_name(name: &str) -> Result<(), CoordinationError> {
    if name.is_empty() || name.contains(SEPARATOR) || name.contains('\0') || name == "." || name == ".." {
        return Err(CoordinationError::InvalidPath {
            path: name.to_string(),
            reason: "invalid node name".to_string(),
        });
    }
    Ok(())
}

/// Join a validated parent path with a child name.
pub fn join(parent: &str, name: &str) -> String {
    if parent == ROOT_PATH {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Parent of a validated path; `None` for the tree root.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT_PATH {
        return None;
    }
    match path.rfind(SEPARATOR) {
        Some(0) => Some(ROOT_PATH),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Last segment of a validated path; empty for the tree root.
pub fn basename(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}
