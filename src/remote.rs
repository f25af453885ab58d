//! Remote client: one logical operation per API call.

use std::sync::Arc;

use tracing::debug;

use crate::api::{ByteStream, ListFolderPage, StorageApi, WriteMode};
use crate::error::{DropboxError, Result};
use crate::fs::entry::{project, RemoteEntry};

/// Thin typed layer over a [`StorageApi`].
///
/// Errors pass through unchanged, except that `download` and `preview` turn
/// an API not-found into [`DropboxError::NotFound`].
#[derive(Debug, Clone)]
pub struct RemoteClient {
    api: Arc<dyn StorageApi>,
}

impl RemoteClient {
    pub fn new(api: Arc<dyn StorageApi>) -> Self {
        Self { api }
    }

    /// The underlying API collaborator.
    pub fn api(&self) -> &Arc<dyn StorageApi> {
        &self.api
    }

    pub async fn stat(&self, path: &str) -> Result<RemoteEntry> {
        debug!(path, "stat");
        let raw = self.api.get_metadata(path).await?;
        project(&raw)
    }

    /// Open a live download stream. The caller drops it to close it.
    pub async fn download(&self, path: &str) -> Result<ByteStream> {
        debug!(path, "download");
        self.api
            .download(path)
            .await
            .map_err(|e| canonical_not_found(e, path))
    }

    /// Open a live stream of the rendered preview of `path`.
    pub async fn preview(&self, path: &str) -> Result<ByteStream> {
        debug!(path, "preview");
        self.api
            .get_preview(path)
            .await
            .map_err(|e| canonical_not_found(e, path))
    }

    /// Upload `body` to `path`, returning once the server has acknowledged.
    pub async fn upload(&self, path: &str, body: ByteStream, mode: WriteMode) -> Result<RemoteEntry> {
        debug!(path, mode = mode.as_str(), "upload");
        let raw = self.api.upload(path, body, mode).await?;
        project(&raw)
    }

    /// Fetch one listing page: the first one when `cursor` is `None`.
    pub async fn list_page(&self, path: &str, cursor: Option<&str>) -> Result<ListFolderPage> {
        match cursor {
            None => {
                debug!(path, "list folder");
                self.api.list_folder(path).await
            }
            Some(cursor) => {
                debug!(path, "list folder continue");
                self.api.list_folder_continue(cursor).await
            }
        }
    }

    pub async fn delete(&self, path: &str) -> Result<RemoteEntry> {
        debug!(path, "delete");
        project(&self.api.delete(path).await?)
    }

    pub async fn copy(&self, from: &str, to: &str) -> Result<RemoteEntry> {
        debug!(from, to, "copy");
        project(&self.api.copy(from, to).await?)
    }

    pub async fn move_to(&self, from: &str, to: &str) -> Result<RemoteEntry> {
        debug!(from, to, "move");
        project(&self.api.move_to(from, to).await?)
    }

    pub async fn mkdir(&self, path: &str) -> Result<RemoteEntry> {
        debug!(path, "mkdir");
        project(&self.api.create_folder(path).await?)
    }

    /// Search under `path`, following `more` pages until the server is done.
    pub async fn search(&self, path: &str, query: &str) -> Result<Vec<RemoteEntry>> {
        let mut results = Vec::new();
        let mut start = 0;

        loop {
            let page = self.api.search(path, query, start).await?;
            debug!(path, query, start, matches = page.matches.len(), "search page");

            for raw in &page.matches {
                results.push(project(raw)?);
            }

            if !page.more {
                break;
            }
            start = page.start;
        }

        Ok(results)
    }
}

fn canonical_not_found(err: DropboxError, path: &str) -> DropboxError {
    if err.is_not_found() {
        DropboxError::NotFound {
            path: path.to_string(),
        }
    } else {
        err
    }
}
