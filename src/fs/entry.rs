//! Remote entry types and metadata projection.

use chrono::{DateTime, FixedOffset};

use crate::api::{RawMetadata, FOLDER_TAG};
use crate::error::{DropboxError, Result};

/// Kind of a remote entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Folder/directory
    Folder,
}

/// Mode bits of an entry, reduced to what the server can tell us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Dir,
    Regular,
}

impl FileMode {
    pub fn is_dir(&self) -> bool {
        *self == FileMode::Dir
    }

    pub fn is_regular(&self) -> bool {
        *self == FileMode::Regular
    }
}

/// A file or folder in the remote namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Last path component
    pub name: String,
    /// Full path with the server's casing, when reported
    pub path_display: Option<String>,
    /// File size in bytes (0 for folders)
    pub size: u64,
    /// Entry kind
    pub kind: EntryKind,
    /// Server modification time, offset kept as reported
    pub server_modified: Option<DateTime<FixedOffset>>,
}

impl RemoteEntry {
    /// Check if this entry is a folder.
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    /// Check if this entry is a file.
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Get the mode of this entry.
    pub fn mode(&self) -> FileMode {
        if self.is_dir() {
            FileMode::Dir
        } else {
            FileMode::Regular
        }
    }
}

/// Project raw server metadata into a [`RemoteEntry`].
///
/// Anything not tagged as a folder is a file. Size is only kept for files.
pub fn project(raw: &RawMetadata) -> Result<RemoteEntry> {
    let kind = if raw.tag.as_deref() == Some(FOLDER_TAG) {
        EntryKind::Folder
    } else {
        EntryKind::File
    };

    let server_modified = raw
        .server_modified
        .as_deref()
        .map(|ts| {
            DateTime::parse_from_rfc3339(ts).map_err(|e| {
                DropboxError::MalformedMetadata(format!(
                    "{}: bad server_modified {:?}: {}",
                    raw.name, ts, e
                ))
            })
        })
        .transpose()?;

    let size = match kind {
        EntryKind::File => raw.size.unwrap_or(0),
        EntryKind::Folder => 0,
    };

    Ok(RemoteEntry {
        name: raw.name.clone(),
        path_display: raw.path_display.clone(),
        size,
        kind,
        server_modified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn raw(tag: Option<&str>, name: &str, size: Option<u64>, modified: Option<&str>) -> RawMetadata {
        RawMetadata {
            tag: tag.map(str::to_string),
            name: name.to_string(),
            path_display: Some(format!("/{}", name)),
            size,
            server_modified: modified.map(str::to_string),
        }
    }

    #[test]
    fn test_project_file() {
        let entry = project(&raw(
            Some("file"),
            "hello.txt",
            Some(5),
            Some("2015-05-12T15:50:38Z"),
        ))
        .unwrap();

        assert_eq!(entry.name, "hello.txt");
        assert_eq!(entry.path_display.as_deref(), Some("/hello.txt"));
        assert_eq!(entry.size, 5);
        assert!(entry.is_file());
        assert!(!entry.is_dir());
        assert!(entry.mode().is_regular());
        assert!(!entry.mode().is_dir());
        assert_eq!(entry.server_modified.unwrap().hour(), 15);
    }

    #[test]
    fn test_project_folder() {
        let entry = project(&raw(Some("folder"), "docs", Some(42), None)).unwrap();
        assert_eq!(entry.kind, EntryKind::Folder);
        assert!(entry.mode().is_dir());
        assert_eq!(entry.size, 0);
        assert!(entry.server_modified.is_none());
    }

    #[test]
    fn test_untagged_and_deleted_are_files() {
        assert!(project(&raw(None, "a", None, None)).unwrap().is_file());
        assert!(project(&raw(Some("deleted"), "b", None, None))
            .unwrap()
            .is_file());
    }

    #[test]
    fn test_timestamp_offset_kept_verbatim() {
        let entry = project(&raw(
            Some("file"),
            "a",
            Some(1),
            Some("2020-01-02T03:04:05+09:00"),
        ))
        .unwrap();
        let ts = entry.server_modified.unwrap();
        assert_eq!(ts.hour(), 3);
        assert_eq!(ts.offset().local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_malformed_timestamp() {
        let err = project(&raw(Some("file"), "a", Some(1), Some("yesterday"))).unwrap_err();
        assert!(matches!(err, DropboxError::MalformedMetadata(_)));
    }
}
