//! Version numbering for page history.
//!
//! Numbers are assigned by reading the current maximum and inserting the
//! next one. Two writers can read the same maximum; the uniqueness
//! constraint on `(page_id, version_number)` rejects the slower insert and
//! [`retry_on_conflict`] reruns the whole read-and-insert unit.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::StoreError;

const RETRY_BACKOFF: Duration = Duration::from_millis(5);

/// The number the next snapshot of a page gets: one past the current
/// maximum, starting at 1.
pub fn next_version_number(current_max: Option<i32>) -> i32 {
    current_max.unwrap_or(0) + 1
}

/// Run `op` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` attempts have hit a version conflict.
///
/// `op` receives the 1-based attempt number and must redo its whole
/// transaction; a conflicting insert leaves the old transaction unusable.
pub async fn retry_on_conflict<T, F, Fut>(max_attempts: u32, mut op: F) -> Result<T, StoreError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %err, "version conflict, retrying");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Barrier;
    use uuid::Uuid;

    /// In-memory stand-in for `page_versions` with its uniqueness constraint.
    #[derive(Default)]
    struct VersionTable {
        rows: Mutex<Vec<(Uuid, i32)>>,
    }

    impl VersionTable {
        fn max(&self, page_id: Uuid) -> Option<i32> {
            let rows = self.rows.lock().unwrap();
            rows.iter().filter(|(p, _)| *p == page_id).map(|(_, v)| *v).max()
        }

        fn insert(&self, page_id: Uuid, version: i32) -> Result<i32, StoreError> {
            let mut rows = self.rows.lock().unwrap();
            if rows.contains(&(page_id, version)) {
                return Err(StoreError::VersionConflict { page_id, version });
            }
            rows.push((page_id, version));
            Ok(version)
        }

        async fn snapshot(&self, page_id: Uuid) -> Result<i32, StoreError> {
            let version = next_version_number(self.max(page_id));
            tokio::task::yield_now().await;
            self.insert(page_id, version)
        }

        fn versions(&self, page_id: Uuid) -> Vec<i32> {
            let rows = self.rows.lock().unwrap();
            let mut versions: Vec<i32> = rows.iter().filter(|(p, _)| *p == page_id).map(|(_, v)| *v).collect();
            versions.sort_unstable();
            versions
        }
    }

    #[test]
    fn test_next_version_number() {
        assert_eq!(next_version_number(None), 1);
        assert_eq!(next_version_number(Some(1)), 2);
        assert_eq!(next_version_number(Some(41)), 42);
    }

    #[tokio::test]
    async fn test_sequential_updates_number_from_one() {
        let table = VersionTable::default();
        let page_id = Uuid::new_v4();
        for _ in 0..3 {
            retry_on_conflict(1, |_| table.snapshot(page_id)).await.unwrap();
        }
        assert_eq!(table.versions(page_id), vec![1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_concurrent_writers_never_both_write_version_two() {
        let table = Arc::new(VersionTable::default());
        let page_id = Uuid::new_v4();
        table.insert(page_id, 1).unwrap();

        // Both writers read the maximum before either inserts.
        let barrier = Arc::new(Barrier::new(2));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let table = Arc::clone(&table);
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                let version = next_version_number(table.max(page_id));
                barrier.wait().await;
                table.insert(page_id, version)
            }));
        }

        let mut written = Vec::new();
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(version) => written.push(version),
                Err(StoreError::VersionConflict { version, .. }) => {
                    assert_eq!(version, 2);
                    conflicts += 1;
                }
                Err(other) => panic!("Unexpected error: {:?}", other),
            }
        }
        assert_eq!(written, vec![2]);
        assert_eq!(conflicts, 1);
        assert_eq!(table.versions(page_id), vec![1, 2]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_with_retry_are_gap_free() {
        const WRITERS: usize = 8;
        let table = Arc::new(VersionTable::default());
        let page_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..WRITERS {
            let table = Arc::clone(&table);
            handles.push(tokio::spawn(async move {
                retry_on_conflict(WRITERS as u32, |_| table.snapshot(page_id)).await
            }));
        }

        let mut written = HashSet::new();
        for handle in handles {
            let version = handle.await.unwrap().unwrap();
            assert!(written.insert(version), "version {} written twice", version);
        }

        let expected: Vec<i32> = (1..=WRITERS as i32).collect();
        assert_eq!(table.versions(page_id), expected);
    }

    #[tokio::test]
    async fn test_conflict_surfaces_after_max_attempts() {
        let page_id = Uuid::new_v4();
        let mut calls = 0;
        let result: Result<(), StoreError> = retry_on_conflict(3, |_| {
            calls += 1;
            async move { Err(StoreError::VersionConflict { page_id, version: 1 }) }
        })
        .await;

        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let mut attempts = Vec::new();
        let result: Result<(), StoreError> = retry_on_conflict(5, |attempt| {
            attempts.push(attempt);
            async { Err(StoreError::PageNotFound(Uuid::nil())) }
        })
        .await;

        assert!(matches!(result, Err(StoreError::PageNotFound(_))));
        assert_eq!(attempts, vec![1]);
    }
}
