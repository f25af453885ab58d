//! Dropbox API error summaries.

/// Broad categories of Dropbox `error_summary` strings.
///
/// Summaries look like `path/not_found/..` or `to/conflict/file/.`: a
/// slash-separated chain of tags, with trailing dots added by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Path (or lookup source) does not exist
    NotFound,
    /// Something already exists at the target
    Conflict,
    /// Account is out of space
    InsufficientSpace,
    /// Name is not allowed by the server
    DisallowedName,
    /// Path could not be parsed
    MalformedPath,
    /// Content is restricted
    RestrictedContent,
    /// Concurrent writes to the same namespace
    TooManyWriteOperations,
    /// Access token is invalid
    InvalidAccessToken,
    /// Access token has expired
    ExpiredAccessToken,
    /// No preview can be generated for this file
    UnsupportedFile,
    /// Anything else
    Unknown,
}

impl ApiErrorKind {
    /// Classify an `error_summary` string.
    pub fn from_summary(summary: &str) -> Self {
        let tags: Vec<&str> = summary
            .split('/')
            .map(|t| t.trim_end_matches('.'))
            .filter(|t| !t.is_empty())
            .collect();

        // The first tag names the argument, the second the failure.
        let failure = tags.get(1).copied().unwrap_or_default();
        let head = tags.first().copied().unwrap_or_default();

        match (head, failure) {
            (_, "not_found") | ("not_found", _) => ApiErrorKind::NotFound,
            (_, "conflict") => ApiErrorKind::Conflict,
            (_, "insufficient_space") | ("insufficient_space", _) => {
                ApiErrorKind::InsufficientSpace
            }
            (_, "disallowed_name") => ApiErrorKind::DisallowedName,
            (_, "malformed_path") => ApiErrorKind::MalformedPath,
            (_, "restricted_content") => ApiErrorKind::RestrictedContent,
            (_, "too_many_write_operations") | ("too_many_write_operations", _) => {
                ApiErrorKind::TooManyWriteOperations
            }
            ("invalid_access_token", _) => ApiErrorKind::InvalidAccessToken,
            ("expired_access_token", _) => ApiErrorKind::ExpiredAccessToken,
            ("unsupported_file", _) | ("unsupported_extension", _) | ("unsupported_content", _) => {
                ApiErrorKind::UnsupportedFile
            }
            _ => ApiErrorKind::Unknown,
        }
    }

    /// Check if this kind means the path is missing.
    pub fn is_not_found(&self) -> bool {
        *self == ApiErrorKind::NotFound
    }

    /// Get human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ApiErrorKind::NotFound => "Path not found",
            ApiErrorKind::Conflict => "Path already exists",
            ApiErrorKind::InsufficientSpace => "Insufficient space",
            ApiErrorKind::DisallowedName => "Disallowed name",
            ApiErrorKind::MalformedPath => "Malformed path",
            ApiErrorKind::RestrictedContent => "Restricted content",
            ApiErrorKind::TooManyWriteOperations => "Too many write operations",
            ApiErrorKind::InvalidAccessToken => "Invalid access token",
            ApiErrorKind::ExpiredAccessToken => "Expired access token",
            ApiErrorKind::UnsupportedFile => "Unsupported file",
            ApiErrorKind::Unknown => "Unknown error",
        }
    }
}
