//! In-process storage API.
//!
//! `MemoryApi` keeps a namespace in a map and answers every [`StorageApi`]
//! call the way the Dropbox routes do: paged listings with cursors, offset
//! based search, `error_summary` style failures. Page sizes are configurable
//! and calls are counted, so tests can check how many requests an operation
//! needed.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::{
    ByteStream, ListFolderPage, RawMetadata, SearchPage, StorageApi, WriteMode, FILE_TAG,
    FOLDER_TAG,
};
use crate::error::{DropboxError, Result};
use crate::fs::utils::{file_name, normalize_path, parent_path};

/// Extensions the preview route accepts.
const PREVIEW_EXTENSIONS: &[&str] = &[
    "pdf", "txt", "csv", "rtf", "doc", "docx", "odt", "ppt", "pptx", "xls", "xlsx",
];

#[derive(Debug, Clone)]
enum MemoryNode {
    Folder,
    File { data: Bytes, modified: String },
}

#[derive(Debug, Default)]
struct MemoryState {
    nodes: BTreeMap<String, MemoryNode>,
    /// Issued cursors: folder path and offset of the next page.
    cursors: HashMap<String, (String, usize)>,
    next_cursor: u64,
}

/// In-memory [`StorageApi`] implementation.
#[derive(Debug)]
pub struct MemoryApi {
    state: Mutex<MemoryState>,
    page_size: usize,
    search_page_size: usize,
    list_calls: AtomicUsize,
    continue_calls: AtomicUsize,
    search_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    fail_uploads: AtomicBool,
}

fn api_error(summary: &str) -> DropboxError {
    DropboxError::Api {
        status: 409,
        summary: summary.to_string(),
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// True if `path` is `root` or lies below it.
fn is_within(path: &str, root: &str) -> bool {
    if root == "/" {
        return true;
    }
    path == root
        || path
            .strip_prefix(root)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}

impl MemoryState {
    fn exists(&self, path: &str) -> bool {
        path == "/" || self.nodes.contains_key(path)
    }

    fn is_folder(&self, path: &str) -> bool {
        path == "/" || matches!(self.nodes.get(path), Some(MemoryNode::Folder))
    }

    fn metadata(&self, path: &str) -> Option<RawMetadata> {
        let node = if path == "/" {
            MemoryNode::Folder
        } else {
            self.nodes.get(path)?.clone()
        };
        Some(match node {
            MemoryNode::Folder => RawMetadata {
                tag: Some(FOLDER_TAG.to_string()),
                name: file_name(path).to_string(),
                path_display: Some(path.to_string()),
                size: None,
                server_modified: None,
            },
            MemoryNode::File { data, modified } => RawMetadata {
                tag: Some(FILE_TAG.to_string()),
                name: file_name(path).to_string(),
                path_display: Some(path.to_string()),
                size: Some(data.len() as u64),
                server_modified: Some(modified),
            },
        })
    }

    /// Create missing ancestor folders of `path`.
    fn ensure_parents(&mut self, path: &str) -> Result<()> {
        let parent = parent_path(path);
        if parent == "/" {
            return Ok(());
        }
        match self.nodes.get(parent) {
            Some(MemoryNode::Folder) => Ok(()),
            Some(MemoryNode::File { .. }) => Err(api_error("path/conflict/file/..")),
            None => {
                self.ensure_parents(parent)?;
                self.nodes.insert(parent.to_string(), MemoryNode::Folder);
                Ok(())
            }
        }
    }

    fn children(&self, folder: &str) -> Vec<RawMetadata> {
        self.nodes
            .keys()
            .filter(|path| parent_path(path) == folder)
            .filter_map(|path| self.metadata(path))
            .collect()
    }

    fn page(&mut self, folder: &str, offset: usize, page_size: usize) -> ListFolderPage {
        let children = self.children(folder);
        let end = (offset + page_size).min(children.len());
        let entries = children[offset.min(end)..end].to_vec();

        self.next_cursor += 1;
        let cursor = format!("cursor-{}", self.next_cursor);
        self.cursors
            .insert(cursor.clone(), (folder.to_string(), end));

        ListFolderPage {
            entries,
            cursor,
            has_more: end < children.len(),
        }
    }

    fn subtree(&self, root: &str) -> Vec<(String, MemoryNode)> {
        self.nodes
            .iter()
            .filter(|(path, _)| is_within(path, root))
            .map(|(path, node)| (path.clone(), node.clone()))
            .collect()
    }
}

impl MemoryApi {
    /// Create an empty namespace with a listing page size of 2000 and a
    /// search page size of 100.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            page_size: 2000,
            search_page_size: 100,
            list_calls: AtomicUsize::new(0),
            continue_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            fail_uploads: AtomicBool::new(false),
        }
    }

    /// Set the number of entries per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set the number of matches per search page.
    pub fn with_search_page_size(mut self, page_size: usize) -> Self {
        self.search_page_size = page_size.max(1);
        self
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a file directly, creating parent folders as needed.
    pub fn insert_file(&self, path: &str, data: impl Into<Bytes>) -> Result<()> {
        let path = normalize_path(path);
        let mut state = self.state();
        state.ensure_parents(&path)?;
        state.nodes.insert(
            path,
            MemoryNode::File {
                data: data.into(),
                modified: now(),
            },
        );
        Ok(())
    }

    /// Create a folder directly, creating parent folders as needed.
    pub fn insert_folder(&self, path: &str) -> Result<()> {
        let path = normalize_path(path);
        if path == "/" {
            return Ok(());
        }
        let mut state = self.state();
        state.ensure_parents(&path)?;
        state.nodes.insert(path, MemoryNode::Folder);
        Ok(())
    }

    /// Contents of the file at `path`, if there is one.
    pub fn file_contents(&self, path: &str) -> Option<Bytes> {
        match self.state().nodes.get(&normalize_path(path)) {
            Some(MemoryNode::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    /// Make every following upload fail before reading its body.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Number of `list_folder` calls served.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `list_folder_continue` calls served.
    pub fn continue_calls(&self) -> usize {
        self.continue_calls.load(Ordering::SeqCst)
    }

    /// Number of `search` calls served.
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Number of `upload` calls received, including failed ones.
    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }
}

impl Default for MemoryApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageApi for MemoryApi {
    async fn get_metadata(&self, path: &str) -> Result<RawMetadata> {
        let path = normalize_path(path);
        self.state()
            .metadata(&path)
            .ok_or_else(|| api_error("path/not_found/.."))
    }

    async fn list_folder(&self, path: &str) -> Result<ListFolderPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let path = normalize_path(path);
        let mut state = self.state();

        if !state.exists(&path) {
            return Err(api_error("path/not_found/.."));
        }
        if !state.is_folder(&path) {
            return Err(api_error("path/not_folder/.."));
        }
        Ok(state.page(&path, 0, self.page_size))
    }

    async fn list_folder_continue(&self, cursor: &str) -> Result<ListFolderPage> {
        self.continue_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();

        let (folder, offset) = state
            .cursors
            .remove(cursor)
            .ok_or_else(|| api_error("reset/.."))?;
        Ok(state.page(&folder, offset, self.page_size))
    }

    async fn download(&self, path: &str) -> Result<ByteStream> {
        let path = normalize_path(path);
        match self.state().nodes.get(&path) {
            Some(MemoryNode::File { data, .. }) => {
                Ok(Box::pin(std::io::Cursor::new(data.clone())))
            }
            Some(MemoryNode::Folder) => Err(api_error("path/not_file/..")),
            None => Err(api_error("path/not_found/..")),
        }
    }

    async fn get_preview(&self, path: &str) -> Result<ByteStream> {
        let path = normalize_path(path);
        let data = match self.state().nodes.get(&path) {
            Some(MemoryNode::File { data, .. }) => data.clone(),
            Some(MemoryNode::Folder) => return Err(api_error("path/not_file/..")),
            None => return Err(api_error("path/not_found/..")),
        };

        let extension = file_name(&path)
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !PREVIEW_EXTENSIONS.contains(&extension.as_str()) {
            return Err(api_error("unsupported_extension/.."));
        }
        Ok(Box::pin(std::io::Cursor::new(data)))
    }

    async fn upload(&self, path: &str, mut body: ByteStream, mode: WriteMode) -> Result<RawMetadata> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(api_error("path/insufficient_space/.."));
        }

        let path = normalize_path(path);
        let mut buf = Vec::new();
        body.read_to_end(&mut buf).await?;
        debug!(path = %path, bytes = buf.len(), "memory upload");

        let mut state = self.state();
        match (state.nodes.get(&path), mode) {
            (Some(MemoryNode::Folder), _) => return Err(api_error("path/conflict/folder/..")),
            (Some(MemoryNode::File { .. }), WriteMode::Add) => {
                return Err(api_error("path/conflict/file/.."))
            }
            _ => {}
        }
        state.ensure_parents(&path)?;
        state.nodes.insert(
            path.clone(),
            MemoryNode::File {
                data: Bytes::from(buf),
                modified: now(),
            },
        );
        state
            .metadata(&path)
            .ok_or_else(|| api_error("path/not_found/.."))
    }

    async fn delete(&self, path: &str) -> Result<RawMetadata> {
        let path = normalize_path(path);
        let mut state = self.state();
        if path == "/" {
            return Err(api_error("path_lookup/restricted_content/.."));
        }
        let meta = state
            .metadata(&path)
            .ok_or_else(|| api_error("path_lookup/not_found/.."))?;
        state.nodes.retain(|p, _| !is_within(p, &path));
        Ok(meta)
    }

    async fn copy(&self, from: &str, to: &str) -> Result<RawMetadata> {
        let (from, to) = (normalize_path(from), normalize_path(to));
        let mut state = self.state();

        if from == "/" || !state.exists(&from) {
            return Err(api_error("from_lookup/not_found/.."));
        }
        if state.exists(&to) {
            return Err(api_error("to/conflict/.."));
        }
        if is_within(&to, &from) {
            return Err(api_error("duplicated_or_nested_paths/.."));
        }

        state.ensure_parents(&to)?;
        for (path, node) in state.subtree(&from) {
            let target = format!("{}{}", to, &path[from.len()..]);
            state.nodes.insert(target, node);
        }
        state
            .metadata(&to)
            .ok_or_else(|| api_error("to/not_found/.."))
    }

    async fn move_to(&self, from: &str, to: &str) -> Result<RawMetadata> {
        let meta = self.copy(from, to).await?;
        let from = normalize_path(from);
        self.state().nodes.retain(|p, _| !is_within(p, &from));
        Ok(meta)
    }

    async fn create_folder(&self, path: &str) -> Result<RawMetadata> {
        let path = normalize_path(path);
        let mut state = self.state();
        if state.exists(&path) {
            return Err(api_error("path/conflict/folder/.."));
        }
        state.ensure_parents(&path)?;
        state.nodes.insert(path.clone(), MemoryNode::Folder);
        state
            .metadata(&path)
            .ok_or_else(|| api_error("path/not_found/.."))
    }

    async fn search(&self, path: &str, query: &str, start: u64) -> Result<SearchPage> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let path = normalize_path(path);
        let query = query.to_lowercase();
        let state = self.state();

        if !state.is_folder(&path) {
            return Err(api_error("path/not_found/.."));
        }

        let hits: Vec<RawMetadata> = state
            .nodes
            .keys()
            .filter(|p| p.as_str() != path && is_within(p, &path))
            .filter(|p| file_name(p).to_lowercase().contains(&query))
            .filter_map(|p| state.metadata(p))
            .collect();

        let start = (start as usize).min(hits.len());
        let end = (start + self.search_page_size).min(hits.len());

        Ok(SearchPage {
            matches: hits[start..end].to_vec(),
            more: end < hits.len(),
            start: end as u64,
        })
    }
}
