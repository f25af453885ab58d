//! Caller-facing client.

use std::sync::Arc;

use tokio::io::AsyncRead;

use crate::api::{ByteStream, DropboxApi, StorageApi, WriteMode};
use crate::config::{Config, DEFAULT_PIPE_CAPACITY};
use crate::error::Result;
use crate::fs::handle::FileHandle;
use crate::fs::listing;
use crate::fs::RemoteEntry;
use crate::remote::RemoteClient;

/// Filesystem-style access to a Dropbox namespace.
///
/// Cloning is cheap; clones share the same API client.
///
/// ```no_run
/// use dropfs::{Client, Config};
///
/// # async fn example() -> dropfs::Result<()> {
/// let client = Client::new(Config::from_env()?)?;
///
/// let mut file = client.open("/notes/today.txt");
/// file.write(b"Hello").await?;
/// file.write(b" World").await?;
/// file.close().await?;
///
/// let data = client.read_all("/notes/today.txt").await?;
/// assert_eq!(data, b"Hello World");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    remote: RemoteClient,
    pipe_capacity: usize,
}

impl Client {
    /// Create a client talking to Dropbox over HTTP.
    pub fn new(config: Config) -> Result<Self> {
        let api = DropboxApi::new(&config)?;
        Ok(Self {
            remote: RemoteClient::new(Arc::new(api)),
            pipe_capacity: config.pipe_capacity,
        })
    }

    /// Create a client over any [`StorageApi`] implementation.
    pub fn with_api(api: Arc<dyn StorageApi>) -> Self {
        Self {
            remote: RemoteClient::new(api),
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }

    /// Set the pipe capacity used by handles opened afterwards.
    pub fn with_pipe_capacity(mut self, capacity: usize) -> Self {
        self.pipe_capacity = capacity.max(1);
        self
    }

    pub fn remote(&self) -> &RemoteClient {
        &self.remote
    }

    /// Metadata of `path`. Missing paths fail with an error for which
    /// [`DropboxError::is_not_found`](crate::DropboxError::is_not_found) holds.
    pub async fn stat(&self, path: &str) -> Result<RemoteEntry> {
        self.remote.stat(path).await
    }

    /// Whether `path` exists.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        match self.remote.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Every entry directly inside `path`.
    pub async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        listing::list(&self.remote, path, 0).await
    }

    /// At most `max_count` entries of `path`; `max_count <= 0` lists everything.
    pub async fn list_bounded(&self, path: &str, max_count: i64) -> Result<Vec<RemoteEntry>> {
        listing::list(&self.remote, path, max_count).await
    }

    pub async fn filter<F>(&self, path: &str, predicate: F) -> Result<Vec<RemoteEntry>>
    where
        F: Fn(&RemoteEntry) -> bool,
    {
        listing::filter(&self.remote, path, predicate).await
    }

    pub async fn folders(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        listing::folders(&self.remote, path).await
    }

    pub async fn files(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        listing::files(&self.remote, path).await
    }

    /// Open a handle on `path`. No request is made until the first read or write.
    pub fn open(&self, path: &str) -> FileHandle {
        FileHandle::new(self.remote.clone(), path, self.pipe_capacity)
    }

    /// Read the whole file at `path`.
    pub async fn read_all(&self, path: &str) -> Result<Vec<u8>> {
        let mut handle = self.open(path);
        let data = handle.read_to_end().await;
        let closed = handle.close().await;
        let data = data?;
        closed?;
        Ok(data)
    }

    /// Raw download stream of `path`.
    pub async fn download(&self, path: &str) -> Result<ByteStream> {
        self.remote.download(path).await
    }

    /// Stream of the server-rendered preview of `path`.
    pub async fn preview(&self, path: &str) -> Result<ByteStream> {
        self.remote.preview(path).await
    }

    /// Upload everything `reader` yields to `path`, replacing any existing file.
    pub async fn upload<R>(&self, path: &str, reader: R) -> Result<RemoteEntry>
    where
        R: AsyncRead + Send + 'static,
    {
        self.remote
            .upload(path, Box::pin(reader), WriteMode::Overwrite)
            .await
    }

    pub async fn mkdir(&self, path: &str) -> Result<RemoteEntry> {
        self.remote.mkdir(path).await
    }

    pub async fn delete(&self, path: &str) -> Result<RemoteEntry> {
        self.remote.delete(path).await
    }

    pub async fn copy(&self, from: &str, to: &str) -> Result<RemoteEntry> {
        self.remote.copy(from, to).await
    }

    pub async fn move_to(&self, from: &str, to: &str) -> Result<RemoteEntry> {
        self.remote.move_to(from, to).await
    }

    /// Every entry under `path` whose name matches `query`.
    pub async fn search(&self, path: &str, query: &str) -> Result<Vec<RemoteEntry>> {
        self.remote.search(path, query).await
    }
}
