//! Directory enumeration over paged listings.

use tracing::debug;

use crate::error::{DropboxError, Result};
use crate::fs::entry::{project, RemoteEntry};
use crate::remote::RemoteClient;

/// List entries in `path`, up to `max_count`, or all when `max_count <= 0`.
///
/// Pages are requested until the server reports no more entries, or until
/// `max_count` entries have been collected. A bounded listing that finds
/// nothing fails with [`DropboxError::EndOfSequence`].
pub async fn list(remote: &RemoteClient, path: &str, max_count: i64) -> Result<Vec<RemoteEntry>> {
    let limit = (max_count > 0).then(|| usize::try_from(max_count).unwrap_or(usize::MAX));

    let mut entries = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = remote.list_page(path, cursor.as_deref()).await?;
        debug!(
            path,
            page_entries = page.entries.len(),
            has_more = page.has_more,
            "listing page"
        );

        for raw in &page.entries {
            entries.push(project(raw)?);
        }

        if let Some(limit) = limit {
            if entries.len() >= limit {
                entries.truncate(limit);
                break;
            }
        }

        if !page.has_more {
            break;
        }
        cursor = Some(page.cursor);
    }

    if limit.is_some() && entries.is_empty() {
        return Err(DropboxError::EndOfSequence);
    }

    Ok(entries)
}

/// List every entry in `path` and keep those matching `predicate`.
pub async fn filter<F>(remote: &RemoteClient, path: &str, predicate: F) -> Result<Vec<RemoteEntry>>
where
    F: Fn(&RemoteEntry) -> bool,
{
    let entries = list(remote, path, 0).await?;
    Ok(entries.into_iter().filter(|e| predicate(e)).collect())
}

/// List only the folders in `path`.
pub async fn folders(remote: &RemoteClient, path: &str) -> Result<Vec<RemoteEntry>> {
    filter(remote, path, RemoteEntry::is_dir).await
}

/// List only the files in `path`.
pub async fn files(remote: &RemoteClient, path: &str) -> Result<Vec<RemoteEntry>> {
    filter(remote, path, RemoteEntry::is_file).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use std::sync::Arc;

    fn setup(page_size: usize, files: usize) -> (Arc<MemoryApi>, RemoteClient) {
        let api = Arc::new(MemoryApi::new().with_page_size(page_size));
        api.insert_folder("/list").unwrap();
        for i in 0..files {
            api.insert_file(&format!("/list/{:04}.txt", i), "x").unwrap();
        }
        (api.clone(), RemoteClient::new(api))
    }

    #[tokio::test]
    async fn test_unbounded_reads_every_page() {
        let (api, remote) = setup(10, 95);

        for max in [0, -5] {
            let entries = list(&remote, "/list", max).await.unwrap();
            assert_eq!(entries.len(), 95);
            assert_eq!(entries[0].name, "0000.txt");
            assert_eq!(entries[94].name, "0094.txt");
        }
        assert_eq!(api.list_calls(), 2);
        assert_eq!(api.continue_calls(), 18);
    }

    #[tokio::test]
    async fn test_bounded_truncates_mid_page() {
        let (api, remote) = setup(10, 95);

        let entries = list(&remote, "/list", 23).await.unwrap();
        assert_eq!(entries.len(), 23);
        assert_eq!(entries[22].name, "0022.txt");

        // Pages of 10: the third page reaches 23, nothing further is requested.
        assert_eq!(api.list_calls(), 1);
        assert_eq!(api.continue_calls(), 2);
    }

    #[tokio::test]
    async fn test_bound_on_page_edge_stops() {
        let (api, remote) = setup(10, 95);
        let entries = list(&remote, "/list", 10).await.unwrap();
        assert_eq!(entries.len(), 10);
        assert_eq!(api.continue_calls(), 0);
    }

    #[tokio::test]
    async fn test_bound_larger_than_listing() {
        let (_, remote) = setup(10, 7);
        let entries = list(&remote, "/list", 100).await.unwrap();
        assert_eq!(entries.len(), 7);
    }

    #[tokio::test]
    async fn test_bounded_empty_is_end_of_sequence() {
        let (_, remote) = setup(10, 0);
        let err = list(&remote, "/list", 1).await.unwrap_err();
        assert!(matches!(err, DropboxError::EndOfSequence));

        // The largest bound still counts as bounded.
        let err = list(&remote, "/list", i64::MAX).await.unwrap_err();
        assert!(matches!(err, DropboxError::EndOfSequence));

        // Unbounded empty listing is a plain success.
        assert!(list(&remote, "/list", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_folder_passes_error_through() {
        let (_, remote) = setup(10, 0);
        let err = list(&remote, "/notfound", 0).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_folders_and_files_partition() {
        let api = Arc::new(MemoryApi::new().with_page_size(2));
        for name in ["one", "three", "two"] {
            api.insert_folder(&format!("/list-types/{}", name)).unwrap();
            api.insert_file(&format!("/list-types/{}.txt", name), "x").unwrap();
        }
        api.insert_file("/list-types/one/nested.txt", "x").unwrap();
        let remote = RemoteClient::new(api);

        let all = list(&remote, "/list-types", 0).await.unwrap();
        let dirs = folders(&remote, "/list-types").await.unwrap();
        let plain = files(&remote, "/list-types").await.unwrap();

        assert_eq!(dirs.len(), 3);
        assert_eq!(plain.len(), 3);
        assert_eq!(dirs.len() + plain.len(), all.len());
        assert_eq!(dirs[0].name, "one");
        assert_eq!(plain[0].name, "one.txt");
        assert!(dirs.iter().all(|e| e.is_dir()));
        assert!(plain.iter().all(|e| e.is_file()));
    }

    #[tokio::test]
    async fn test_filter_predicate() {
        let (_, remote) = setup(10, 30);
        let odd = filter(&remote, "/list", |e| e.name.ends_with("1.txt"))
            .await
            .unwrap();
        assert_eq!(odd.len(), 3);
    }
}
