//! Dropbox v2 API client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{
    ByteStream, ListFolderPage, RawMetadata, SearchPage, StorageApi, WriteMode, FILE_TAG,
    FOLDER_TAG,
};
use crate::config::Config;
use crate::error::Result;
use crate::fs::utils::api_path;
use crate::http::HttpClient;

/// Dropbox API client speaking the v2 HTTP routes.
#[derive(Debug)]
pub struct DropboxApi {
    http: HttpClient,
    search_page_size: u64,
}

/// `{ "metadata": ... }` wrapper used by the `_v2` mutation routes.
#[derive(Deserialize)]
struct MetadataResult {
    metadata: RawMetadata,
}

#[derive(Deserialize)]
struct SearchMatch {
    metadata: RawMetadata,
}

#[derive(Deserialize)]
struct SearchResult {
    matches: Vec<SearchMatch>,
    more: bool,
    start: u64,
}

impl DropboxApi {
    /// Create a new API client.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
            search_page_size: config.search_page_size,
        })
    }
}

#[async_trait]
impl StorageApi for DropboxApi {
    async fn get_metadata(&self, path: &str) -> Result<RawMetadata> {
        self.http
            .rpc("files/get_metadata", &json!({ "path": api_path(path) }))
            .await
    }

    async fn list_folder(&self, path: &str) -> Result<ListFolderPage> {
        self.http
            .rpc("files/list_folder", &json!({ "path": api_path(path) }))
            .await
    }

    async fn list_folder_continue(&self, cursor: &str) -> Result<ListFolderPage> {
        self.http
            .rpc("files/list_folder/continue", &json!({ "cursor": cursor }))
            .await
    }

    async fn download(&self, path: &str) -> Result<ByteStream> {
        self.http
            .content_download("files/download", &json!({ "path": api_path(path) }))
            .await
    }

    async fn get_preview(&self, path: &str) -> Result<ByteStream> {
        self.http
            .content_download("files/get_preview", &json!({ "path": api_path(path) }))
            .await
    }

    async fn upload(&self, path: &str, body: ByteStream, mode: WriteMode) -> Result<RawMetadata> {
        let arg = json!({
            "path": api_path(path),
            "mode": mode.as_str(),
            "mute": true,
        });
        let meta: RawMetadata = self.http.content_upload("files/upload", &arg, body).await?;
        Ok(meta.with_default_tag(FILE_TAG))
    }

    async fn delete(&self, path: &str) -> Result<RawMetadata> {
        let res: MetadataResult = self
            .http
            .rpc("files/delete_v2", &json!({ "path": api_path(path) }))
            .await?;
        Ok(res.metadata)
    }

    async fn copy(&self, from: &str, to: &str) -> Result<RawMetadata> {
        let res: MetadataResult = self
            .http
            .rpc(
                "files/copy_v2",
                &json!({ "from_path": api_path(from), "to_path": api_path(to) }),
            )
            .await?;
        Ok(res.metadata)
    }

    async fn move_to(&self, from: &str, to: &str) -> Result<RawMetadata> {
        let res: MetadataResult = self
            .http
            .rpc(
                "files/move_v2",
                &json!({ "from_path": api_path(from), "to_path": api_path(to) }),
            )
            .await?;
        Ok(res.metadata)
    }

    async fn create_folder(&self, path: &str) -> Result<RawMetadata> {
        let res: MetadataResult = self
            .http
            .rpc("files/create_folder_v2", &json!({ "path": api_path(path) }))
            .await?;
        Ok(res.metadata.with_default_tag(FOLDER_TAG))
    }

    async fn search(&self, path: &str, query: &str, start: u64) -> Result<SearchPage> {
        let res: SearchResult = self
            .http
            .rpc(
                "files/search",
                &json!({
                    "path": api_path(path),
                    "query": query,
                    "start": start,
                    "max_results": self.search_page_size,
                    "mode": "filename",
                }),
            )
            .await?;

        debug!(
            matches = res.matches.len(),
            more = res.more,
            start = res.start,
            "search page"
        );

        Ok(SearchPage {
            matches: res.matches.into_iter().map(|m| m.metadata).collect(),
            more: res.more,
            start: res.start,
        })
    }
}
