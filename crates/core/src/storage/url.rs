//! Public URL resolution.
//!
//! Stored files are served from the bucket's public entry URL. These helpers
//! convert between virtual paths and those public URLs.

use chrono::{DateTime, Utc};
use url::Url;

use super::error::{StorageError, StorageResult};

/// .NET ticks (100 ns units since 0001-01-01) at the Unix epoch.
const TICKS_AT_UNIX_EPOCH: i64 = 621_355_968_000_000_000;

/// Ticks per second.
const TICKS_PER_SECOND: i64 = 10_000_000;

fn parse_base(base: &str) -> StorageResult<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| StorageError::configuration(format!("invalid public entry URL: {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Resolve `path` against the public entry URL.
///
/// The base is treated as a directory, so a root-relative `path` lands under
/// it: `("http://x.test/media", "/a/b.jpg")` gives
/// `"http://x.test/media/a/b.jpg"`. An absolute URL in `path` wins over the
/// base.
///
/// # Errors
///
/// Returns `StorageError::Configuration` if `base` is not an absolute URL
/// and `StorageError::InvalidPath` if `path` cannot be resolved.
pub fn public_url(base: &str, path: &str) -> StorageResult<String> {
    let base = parse_base(base)?;
    let reference = match path.strip_prefix('/') {
        Some(rest) if !rest.starts_with('/') => rest,
        _ => path,
    };
    base.join(reference)
        .map(String::from)
        .map_err(|_| StorageError::invalid_path(path, "cannot be resolved against the public URL"))
}

/// Percent-decoded path component of an absolute URL.
///
/// # Errors
///
/// Returns `StorageError::InvalidPath` if `url` is not an absolute URL or its
/// path does not decode to UTF-8.
pub fn storage_path(url: &str) -> StorageResult<String> {
    let parsed = Url::parse(url).map_err(|_| StorageError::invalid_path(url, "not an absolute URL"))?;
    decode_path(url, parsed.path())
}

/// Virtual path of a public URL served from `base`.
///
/// URLs under the public entry URL lose the base's own path, so
/// `"http://x.test/media/a/b.jpg"` maps back to `"/a/b.jpg"`. Other URLs keep
/// their full path.
///
/// # Errors
///
/// Same as [`storage_path`], plus `StorageError::Configuration` for an
/// invalid `base`.
pub fn storage_path_under(base: &str, url: &str) -> StorageResult<String> {
    let parsed = Url::parse(url).map_err(|_| StorageError::invalid_path(url, "not an absolute URL"))?;
    let base = parse_base(base)?;

    let relative = if parsed.origin() == base.origin() {
        parsed.path().strip_prefix(base.path())
    } else {
        None
    };

    match relative {
        Some(rest) => decode_path(url, &format!("/{rest}")),
        None => decode_path(url, parsed.path()),
    }
}

/// Virtual path for `input`, which is either a path or an http(s) URL.
///
/// # Errors
///
/// Returns `StorageError::InvalidPath` for URLs whose path cannot be decoded.
pub fn normalize_path(base: &str, input: &str) -> StorageResult<String> {
    match Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => storage_path_under(base, input),
        _ => Ok(input.to_string()),
    }
}

fn decode_path(url: &str, path: &str) -> StorageResult<String> {
    urlencoding::decode(path)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| StorageError::invalid_path(url, "path is not valid UTF-8"))
}

/// Convert a timestamp to .NET ticks.
#[must_use]
pub fn dotnet_ticks(time: DateTime<Utc>) -> i64 {
    TICKS_AT_UNIX_EPOCH
        + time.timestamp() * TICKS_PER_SECOND
        + i64::from(time.timestamp_subsec_nanos() / 100)
}

/// URL of an image processing profile applied to a public file URL.
///
/// The last-modified time is appended as a cache buster.
#[must_use]
pub fn profile_url(public_url: &str, profile: &str, last_modified: DateTime<Utc>) -> String {
    format!("{public_url}!{profile}?v={}", dotnet_ticks(last_modified))
}
