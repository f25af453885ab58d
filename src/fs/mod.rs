//! Filesystem view of the remote namespace.

pub mod entry;
pub mod handle;
pub mod listing;
pub(crate) mod utils;

pub use entry::{EntryKind, FileMode, RemoteEntry};
pub use handle::FileHandle;
