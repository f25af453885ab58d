//! Streaming file handle.
//!
//! A handle is bound to one remote path and becomes either a reader or a
//! writer on first use:
//!
//! - The first `read` opens a download and later reads pull from it.
//! - The first `write` opens a bounded in-memory pipe and spawns a single
//!   task that uploads the pipe's read end. Writes push into the pipe and
//!   wait while it is full. `close` ends the stream and waits for the upload
//!   to be acknowledged.
//!
//! Upload failures show up at `close`, or at `write` if the uploader stops
//! reading early.

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::api::{ByteStream, WriteMode};
use crate::error::{DropboxError, Result};
use crate::fs::entry::RemoteEntry;
use crate::remote::RemoteClient;

/// Pipe writer plus the task consuming the other end.
struct PendingUpload {
    pipe: DuplexStream,
    task: JoinHandle<Result<RemoteEntry>>,
}

enum HandleState {
    Idle,
    Reading(ByteStream),
    Writing(PendingUpload),
    /// Opening or uploading failed; the error was already returned.
    Failed,
    Closed,
}

impl HandleState {
    fn name(&self) -> &'static str {
        match self {
            HandleState::Idle => "idle",
            HandleState::Reading(_) => "reading",
            HandleState::Writing(_) => "writing",
            HandleState::Failed => "failed",
            HandleState::Closed => "closed",
        }
    }
}

/// An open remote file, used either for reading or for writing.
pub struct FileHandle {
    path: String,
    remote: RemoteClient,
    pipe_capacity: usize,
    state: HandleState,
    bytes_written: u64,
}

impl FileHandle {
    pub(crate) fn new(remote: RemoteClient, path: &str, pipe_capacity: usize) -> Self {
        Self {
            path: path.to_string(),
            remote,
            pipe_capacity: pipe_capacity.max(1),
            state: HandleState::Idle,
            bytes_written: 0,
        }
    }

    /// Remote path this handle is bound to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Total bytes accepted by `write` so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Read up to `buf.len()` bytes. `Ok(0)` means end of file.
    ///
    /// The first call downloads the file; a missing file fails with
    /// [`DropboxError::NotFound`] and the handle is not retried.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if matches!(self.state, HandleState::Idle) {
            match self.remote.download(&self.path).await {
                Ok(stream) => self.state = HandleState::Reading(stream),
                Err(e) => {
                    self.state = HandleState::Failed;
                    return Err(e);
                }
            }
        }

        match &mut self.state {
            HandleState::Reading(stream) => Ok(stream.read(buf).await?),
            other => Err(DropboxError::InvalidHandleState(format!(
                "cannot read {}: handle is {}",
                self.path,
                other.name()
            ))),
        }
    }

    /// Read everything that is left.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut chunk = vec![0u8; 64 * 1024];
        loop {
            let n = self.read(&mut chunk).await?;
            if n == 0 {
                return Ok(data);
            }
            data.extend_from_slice(&chunk[..n]);
        }
    }

    /// Write all of `buf`, waiting while the upload pipe is full.
    ///
    /// The first call starts the upload, even for an empty buffer.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if matches!(self.state, HandleState::Idle) {
            self.start_upload();
        }

        let pending = match &mut self.state {
            HandleState::Writing(pending) => pending,
            other => {
                return Err(DropboxError::InvalidHandleState(format!(
                    "cannot write {}: handle is {}",
                    self.path,
                    other.name()
                )))
            }
        };

        trace!(path = %self.path, bytes = buf.len(), "pipe write");
        let written = pending.pipe.write_all(buf).await;
        match written {
            Ok(()) => {
                self.bytes_written += buf.len() as u64;
                Ok(buf.len())
            }
            Err(io_err) => {
                // The uploader stopped reading; its result explains why.
                let HandleState::Writing(pending) =
                    std::mem::replace(&mut self.state, HandleState::Failed)
                else {
                    return Err(io_err.into());
                };
                drop(pending.pipe);
                match join_upload(pending.task).await {
                    Ok(_) => Err(io_err.into()),
                    Err(upload_err) => Err(upload_err),
                }
            }
        }
    }

    /// Alias of [`FileHandle::write`], which always writes the whole buffer.
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.write(buf).await.map(|_| ())
    }

    /// Close the handle.
    ///
    /// For a writer this ends the upload stream and waits for the server to
    /// acknowledge, returning any upload error. Closing twice fails with
    /// [`DropboxError::InvalidHandleState`].
    pub async fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, HandleState::Closed) {
            HandleState::Closed => Err(DropboxError::InvalidHandleState(format!(
                "{} is already closed",
                self.path
            ))),
            HandleState::Idle | HandleState::Failed => Ok(()),
            HandleState::Reading(stream) => {
                drop(stream);
                Ok(())
            }
            HandleState::Writing(mut pending) => {
                // A failed shutdown means the reader is gone; the task result says why.
                if let Err(e) = pending.pipe.shutdown().await {
                    debug!(path = %self.path, error = %e, "pipe shutdown failed");
                }
                drop(pending.pipe);

                let entry = join_upload(pending.task).await?;
                debug!(path = %self.path, size = entry.size, "upload complete");
                Ok(())
            }
        }
    }

    fn start_upload(&mut self) {
        let (pipe, reader) = tokio::io::duplex(self.pipe_capacity);
        let remote = self.remote.clone();
        let path = self.path.clone();

        debug!(path = %path, capacity = self.pipe_capacity, "starting upload");
        let task = tokio::spawn(async move {
            let body: ByteStream = Box::pin(reader);
            remote.upload(&path, body, WriteMode::Overwrite).await
        });

        self.state = HandleState::Writing(PendingUpload { pipe, task });
    }
}

async fn join_upload(task: JoinHandle<Result<RemoteEntry>>) -> Result<RemoteEntry> {
    task.await
        .map_err(|e| DropboxError::UploadTask(e.to_string()))?
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.path)
            .field("state", &self.state.name())
            .field("bytes_written", &self.bytes_written)
            .finish()
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        if let HandleState::Writing(pending) = &self.state {
            // Abort before the pipe drops so a partial upload is never committed.
            pending.task.abort();
            warn!(path = %self.path, "write handle dropped without close, upload aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryApi>, RemoteClient) {
        let api = Arc::new(MemoryApi::new());
        (api.clone(), RemoteClient::new(api))
    }

    #[tokio::test]
    async fn test_read_existing_file() {
        let (api, remote) = setup();
        let cap = 16;
        api.insert_file("/hello.txt", "world").unwrap();

        let mut handle = FileHandle::new(remote, "/hello.txt", cap);
        assert_eq!(handle.read_to_end().await.unwrap(), b"world");

        // Exhausted stream keeps reporting end of file.
        let mut buf = [0u8; 4];
        assert_eq!(handle.read(&mut buf).await.unwrap(), 0);
        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found_without_retry() {
        let (_, remote) = setup();
        let cap = 16;
        let mut handle = FileHandle::new(remote, "/dev/null", cap);

        let mut buf = [0u8; 8];
        let err = handle.read(&mut buf).await.unwrap_err();
        assert_eq!(err.to_string(), "open /dev/null: no such file or directory");

        let err = handle.read(&mut buf).await.unwrap_err();
        assert!(matches!(err, DropboxError::InvalidHandleState(_)));
        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_two_writes_concatenate() {
        let (api, remote) = setup();
        let cap = 4;
        let mut handle = FileHandle::new(remote.clone(), "/concat.txt", cap);

        assert_eq!(handle.write(b"Hello").await.unwrap(), 5);
        assert_eq!(handle.write(b" World").await.unwrap(), 6);
        assert_eq!(handle.bytes_written(), 11);
        handle.close().await.unwrap();

        assert_eq!(api.file_contents("/concat.txt").unwrap(), "Hello World");

        let mut reader = FileHandle::new(remote, "/concat.txt", cap);
        assert_eq!(reader.read_to_end().await.unwrap(), b"Hello World");
    }

    #[tokio::test]
    async fn test_zero_byte_write_uploads_empty_file() {
        let (api, remote) = setup();
        let cap = 16;
        let mut handle = FileHandle::new(remote.clone(), "/empty.txt", cap);

        handle.write(&[]).await.unwrap();
        handle.close().await.unwrap();

        assert_eq!(api.upload_calls(), 1);
        let entry = remote.stat("/empty.txt").await.unwrap();
        assert_eq!(entry.size, 0);
        assert!(entry.is_file());
    }

    #[tokio::test]
    async fn test_close_idle_does_not_upload() {
        let (api, remote) = setup();
        let cap = 16;
        let mut handle = FileHandle::new(remote, "/untouched.txt", cap);
        handle.close().await.unwrap();
        assert_eq!(api.upload_calls(), 0);
    }

    #[tokio::test]
    async fn test_double_close() {
        let (_, remote) = setup();
        let cap = 16;
        let mut handle = FileHandle::new(remote, "/twice.txt", cap);
        handle.write(b"data").await.unwrap();

        handle.close().await.unwrap();
        let err = handle.close().await.unwrap_err();
        assert!(matches!(err, DropboxError::InvalidHandleState(_)));
    }

    #[tokio::test]
    async fn test_io_after_close() {
        let (api, remote) = setup();
        api.insert_file("/r.txt", "abc").unwrap();
        let mut buf = [0u8; 4];

        let mut writer = FileHandle::new(remote.clone(), "/w.txt", 16);
        writer.write(b"data").await.unwrap();
        writer.close().await.unwrap();
        assert!(matches!(
            writer.write(b"more").await,
            Err(DropboxError::InvalidHandleState(_))
        ));
        assert!(matches!(
            writer.read(&mut buf).await,
            Err(DropboxError::InvalidHandleState(_))
        ));
        assert_eq!(api.upload_calls(), 1);

        let mut reader = FileHandle::new(remote, "/r.txt", 16);
        reader.read(&mut buf).await.unwrap();
        reader.close().await.unwrap();
        assert!(matches!(
            reader.read(&mut buf).await,
            Err(DropboxError::InvalidHandleState(_))
        ));
        assert!(matches!(
            reader.write(b"x").await,
            Err(DropboxError::InvalidHandleState(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_error_surfaces_at_close() {
        let (api, remote) = setup();
        let cap = 1024;
        api.fail_uploads(true);

        let mut handle = FileHandle::new(remote, "/fail.txt", cap);
        handle.write(b"small").await.unwrap();

        let err = handle.close().await.unwrap_err();
        assert!(matches!(err, DropboxError::Api { .. }));
        assert!(api.file_contents("/fail.txt").is_none());
        assert!(matches!(
            handle.close().await,
            Err(DropboxError::InvalidHandleState(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_error_surfaces_at_write_when_pipe_breaks() {
        let (api, remote) = setup();
        let cap = 4;
        api.fail_uploads(true);

        let mut handle = FileHandle::new(remote, "/fail.txt", cap);
        // Larger than the pipe: the write waits on the uploader, which gives up.
        let err = handle.write(&[7u8; 64]).await.unwrap_err();
        assert!(matches!(err, DropboxError::Api { .. }));

        assert!(matches!(
            handle.write(b"more").await,
            Err(DropboxError::InvalidHandleState(_))
        ));
        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_modes_do_not_mix() {
        let (api, remote) = setup();
        let cap = 16;
        api.insert_file("/r.txt", "abc").unwrap();

        let mut reader = FileHandle::new(remote.clone(), "/r.txt", cap);
        let mut buf = [0u8; 1];
        reader.read(&mut buf).await.unwrap();
        assert!(matches!(
            reader.write(b"x").await,
            Err(DropboxError::InvalidHandleState(_))
        ));

        let mut writer = FileHandle::new(remote, "/w.txt", cap);
        writer.write(b"x").await.unwrap();
        assert!(matches!(
            writer.read(&mut buf).await,
            Err(DropboxError::InvalidHandleState(_))
        ));
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_large_write_streams_through_small_pipe() {
        let (api, remote) = setup();
        let cap = 8;
        let data: Vec<u8> = (0..10_000).map(|i| (i % 251) as u8).collect();

        let mut handle = FileHandle::new(remote, "/big.bin", cap);
        for chunk in data.chunks(333) {
            handle.write(chunk).await.unwrap();
        }
        handle.close().await.unwrap();

        assert_eq!(api.file_contents("/big.bin").unwrap().as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn test_drop_without_close_aborts_upload() {
        let (api, remote) = setup();
        let cap = 16;
        {
            let mut handle = FileHandle::new(remote, "/dropped.txt", cap);
            handle.write(b"partial").await.unwrap();
        }
        tokio::task::yield_now().await;
        assert!(api.file_contents("/dropped.txt").is_none());
    }

    #[test]
    fn test_debug_output() {
        let remote = RemoteClient::new(Arc::new(MemoryApi::new()));
        let handle = FileHandle::new(remote, "/x", 1);
        let out = format!("{:?}", handle);
        assert!(out.contains("idle"));
        assert!(out.contains("/x"));
    }
}
