//! Path helpers shared by the API implementations.

/// Normalize a path (remove trailing slashes, handle //).
pub(crate) fn normalize_path(path: &str) -> String {
    let mut result = path.to_string();
    while result.contains("//") {
        result = result.replace("//", "/");
    }
    while result.ends_with('/') && result.len() > 1 {
        result.pop();
    }
    if !result.starts_with('/') {
        result = format!("/{}", result);
    }
    result
}

/// Path as the Dropbox API wants it: normalized, with the root spelled `""`.
pub(crate) fn api_path(path: &str) -> String {
    let normalized = normalize_path(path);
    if normalized == "/" {
        String::new()
    } else {
        normalized
    }
}

/// Parent of a normalized path. The root is its own parent.
pub(crate) fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// Last component of a normalized path (`""` for the root).
pub(crate) fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}
