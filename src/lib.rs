//! # dropfs
//!
//! Filesystem-style access to Dropbox over the v2 HTTP API.
//!
//! ## Features
//!
//! - **Metadata**: `stat` and `exists` on any path, with entries projected to
//!   name, size, kind and modification time.
//! - **Listing**:
//!   - Paged directory listing, optionally bounded to the first `n` entries.
//!   - `folders` / `files` / `filter` views over a listing.
//! - **File Handles**:
//!   - Lazy streaming reads.
//!   - Streaming writes through a bounded pipe into a single upload, with
//!     errors reported on `close`.
//! - **Namespace Operations**: `mkdir`, `delete`, `copy`, `move_to`.
//! - **Search**: filename search that follows every result page.
//! - **Previews**: raw stream of the server-rendered preview of a document.
//!
//! Paths are absolute and `/`-separated; `/` is the root of the namespace.
//!
//! ## Example: Basic Usage
//!
//! ```no_run
//! use dropfs::{Client, Config};
//!
//! # async fn example() -> dropfs::Result<()> {
//! // Token from DROPBOX_ACCESS_TOKEN
//! let client = Client::new(Config::from_env()?)?;
//!
//! // List the first 10 entries in a folder
//! for entry in client.list_bounded("/Documents", 10).await? {
//!     println!("{} ({} bytes)", entry.name, entry.size);
//! }
//!
//! // Write a file through a handle
//! let mut file = client.open("/Documents/hello.txt");
//! file.write(b"Hello World").await?;
//! file.close().await?;
//!
//! // Search by name
//! let hits = client.search("/Documents", "hello").await?;
//! println!("{} matches", hits.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Testing Without a Network
//!
//! [`MemoryApi`](api::MemoryApi) implements the same API in process:
//!
//! ```
//! use std::sync::Arc;
//! use dropfs::{Client, api::MemoryApi};
//!
//! # async fn example() -> dropfs::Result<()> {
//! let api = Arc::new(MemoryApi::new());
//! api.insert_file("/a.txt", "abc")?;
//!
//! let client = Client::with_api(api);
//! assert_eq!(client.read_all("/a.txt").await?, b"abc");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod fs;
pub mod http;
pub mod remote;

// Re-export commonly used types
pub use api::{ByteStream, StorageApi, WriteMode};
pub use client::Client;
pub use config::Config;
pub use error::{DropboxError, Result};
pub use fs::{EntryKind, FileHandle, FileMode, RemoteEntry};
pub use remote::RemoteClient;
