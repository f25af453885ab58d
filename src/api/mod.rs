//! Storage API collaborator: the trait the rest of the crate talks to, the
//! raw wire types it returns, and two implementations.

pub mod client;
pub mod error;
pub mod memory;

use std::pin::Pin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::error::Result;

pub use client::DropboxApi;
pub use error::ApiErrorKind;
pub use memory::MemoryApi;

/// A live byte stream: a download body, or the source for an upload.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// `.tag` value the server uses for folders.
pub const FOLDER_TAG: &str = "folder";

/// `.tag` value the server uses for files.
pub const FILE_TAG: &str = "file";

/// Metadata as reported by the server, before projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMetadata {
    /// Type tag (`file`, `folder`, `deleted`). Some routes omit it.
    #[serde(rename = ".tag", default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_modified: Option<String>,
}

impl RawMetadata {
    /// Fill in the tag for routes that return untagged metadata.
    pub(crate) fn with_default_tag(mut self, tag: &str) -> Self {
        if self.tag.is_none() {
            self.tag = Some(tag.to_string());
        }
        self
    }
}

/// One page of a folder listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListFolderPage {
    pub entries: Vec<RawMetadata>,
    /// Continuation token for `list_folder_continue`.
    pub cursor: String,
    pub has_more: bool,
}

/// One page of search matches.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub matches: Vec<RawMetadata>,
    /// More matches are available starting at `start`.
    pub more: bool,
    /// Offset to request next.
    pub start: u64,
}

/// Conflict behavior for uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Fail if something already exists at the path.
    Add,
    /// Replace whatever is at the path.
    #[default]
    Overwrite,
}

impl WriteMode {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Add => "add",
            WriteMode::Overwrite => "overwrite",
        }
    }
}

/// Operations the remote namespace must support.
///
/// Paths are absolute (`/a/b.txt`); the root is `/`. Implementations report a
/// missing path with an error for which
/// [`DropboxError::is_not_found`](crate::DropboxError::is_not_found) is true.
#[async_trait]
pub trait StorageApi: Send + Sync + std::fmt::Debug {
    async fn get_metadata(&self, path: &str) -> Result<RawMetadata>;

    async fn list_folder(&self, path: &str) -> Result<ListFolderPage>;

    async fn list_folder_continue(&self, cursor: &str) -> Result<ListFolderPage>;

    async fn download(&self, path: &str) -> Result<ByteStream>;

    async fn get_preview(&self, path: &str) -> Result<ByteStream>;

    /// Consume `body` to the end and store it at `path`.
    async fn upload(&self, path: &str, body: ByteStream, mode: WriteMode) -> Result<RawMetadata>;

    async fn delete(&self, path: &str) -> Result<RawMetadata>;

    async fn copy(&self, from: &str, to: &str) -> Result<RawMetadata>;

    async fn move_to(&self, from: &str, to: &str) -> Result<RawMetadata>;

    async fn create_folder(&self, path: &str) -> Result<RawMetadata>;

    /// Search under `path` for names matching `query`, starting at offset `start`.
    async fn search(&self, path: &str, query: &str, start: u64) -> Result<SearchPage>;
}
