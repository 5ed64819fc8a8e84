//! Storage-key derivation shared by the orchestrator and the gateway.

/// Filename used when a source URL has no usable last segment.
pub const DEFAULT_FILENAME: &str = "input.jpg";

/// Last non-empty path segment of an http(s) URL, percent-decoding left as-is.
///
/// Returns `None` when the URL does not parse or has no final segment.
pub fn filename_from_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    let name = parsed.path_segments()?.next_back()?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_owned())
}

/// `{prefix}/{owner}/{filename}`, skipping an empty prefix.
pub fn derive_object_key(prefix: &str, owner: &str, filename: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let owner = owner.trim_matches('/');
    let filename = filename.trim_start_matches('/');
    if prefix.is_empty() {
        format!("{owner}/{filename}")
    } else {
        format!("{prefix}/{owner}/{filename}")
    }
}

/// Reject keys that are empty, absolute, or contain `.`/`..`/empty segments.
pub fn validate_object_key(key: &str) -> Result<(), String> {
    if key.trim().is_empty() {
        return Err("storage key must not be empty".into());
    }
    if key.starts_with('/') {
        return Err(format!("storage key '{key}' must be relative"));
    }
    if key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(format!("storage key '{key}' contains an invalid path segment"));
    }
    Ok(())
}
