//! Mapping between virtual media paths and object keys.
//!
//! A virtual path always starts with `/`; its object key is the same string
//! with that one leading `/` removed. Keys ending in `/` are folder markers.

use super::error::{StorageError, StorageResult};

/// Path separator shared by virtual paths and object keys.
pub const SEPARATOR: char = '/';

/// Convert a virtual path to its object key.
///
/// Strips exactly one leading `/`, so `"//a"` maps to `"/a"`. The root path
/// `/` maps to the empty key.
///
/// # Errors
///
/// Returns `StorageError::InvalidPath` if `path` does not start with `/`.
pub fn to_key(path: &str) -> StorageResult<&str> {
    path.strip_prefix(SEPARATOR)
        .ok_or_else(|| StorageError::invalid_path(path, "path must start with '/'"))
}

/// Convert a virtual path to a folder key ending in `/`.
///
/// Idempotent: a key that already ends in `/` is returned unchanged. The
/// root path is the one exception to the trailing `/`: it maps to the empty
/// key, which stores use to address the bucket root as a listing prefix.
///
/// # Errors
///
/// Returns `StorageError::InvalidPath` if `path` does not start with `/`.
pub fn to_folder_key(path: &str) -> StorageResult<String> {
    let key = to_key(path)?;
    if key.is_empty() || key.ends_with(SEPARATOR) {
        Ok(key.to_string())
    } else {
        Ok(format!("{key}{SEPARATOR}"))
    }
}

/// Convert an object key back to its virtual path.
#[must_use]
pub fn to_path(key: &str) -> String {
    format!("{SEPARATOR}{key}")
}

/// Convert a virtual path to a key that can be sent to the store.
///
/// # Errors
///
/// Returns `StorageError::InvalidPath` if `path` does not start with `/` or
/// is the root path, whose key is empty.
pub fn require_object_key(path: &str) -> StorageResult<&str> {
    let key = to_key(path)?;
    if key.is_empty() {
        return Err(StorageError::invalid_path(path, "path maps to the empty key"));
    }
    Ok(key)
}

/// Last segment of a path or key.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rsplit(SEPARATOR).next().unwrap_or(path)
}

/// Extension of the last segment including the dot, or `""` when none.
#[must_use]
pub fn extension(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[idx..],
        _ => "",
    }
}

/// Join two path fragments with a single `/`.
///
/// An absolute `child` replaces `parent`, and empty fragments are skipped.
#[must_use]
pub fn combine(parent: &str, child: &str) -> String {
    if child.starts_with(SEPARATOR) || parent.is_empty() {
        return child.to_string();
    }
    if child.is_empty() {
        return parent.to_string();
    }
    format!("{}{SEPARATOR}{child}", parent.trim_end_matches(SEPARATOR))
}
