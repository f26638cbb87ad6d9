//! Page accumulation for paged backend operations.
//!
//! A paged backend answers each request with a batch of items and an opaque
//! continuation cursor; a present cursor is the sole "more data exists"
//! signal. [`accumulate`] folds those pages into one ordered result,
//! retrying each page through the caller's [`RetryPolicy`] and honoring an
//! optional item-count ceiling.

use crate::{Result, RetryPolicy, TRACING_TARGET_PAGE};

/// One page of a backend response.
#[derive(Debug, Clone)]
pub struct Page<T, C> {
    /// Items of this page. `None` is a valid empty page: some backends omit
    /// the items field entirely when a page matches nothing.
    pub items: Option<Vec<T>>,
    /// Continuation cursor for the next page, when more data exists.
    pub next_cursor: Option<C>,
}

/// The merged result of a paged operation.
#[derive(Debug, Clone)]
pub struct Accumulated<T, C> {
    /// All items, in page arrival order.
    pub items: Vec<T>,
    /// The final executed page's cursor, for external resumption.
    pub last_cursor: Option<C>,
}

/// Drives a paged operation to its natural end or to the ceiling.
///
/// `fetch` is invoked with the current cursor (initially `start_cursor`) and
/// must build the identical backend request each time, the cursor being the
/// only part that changes between pages. Each page runs through `policy`, so
/// a transiently failing page is retried at its own cursor and accumulation
/// resumes where it left off. A non-retryable failure, or an exhausted
/// budget, discards everything accumulated so far and propagates the error.
///
/// Items never exceed `ceiling`: a page that overshoots is cut and its
/// cursor kept, so the caller can resume externally.
pub async fn accumulate<T, C, F, Fut>(
    policy: &RetryPolicy,
    start_cursor: Option<C>,
    ceiling: Option<usize>,
    mut fetch: F,
) -> Result<Accumulated<T, C>>
where
    C: Clone,
    F: FnMut(Option<C>) -> Fut,
    Fut: std::future::Future<Output = Result<Page<T, C>>>,
{
    let mut items: Vec<T> = Vec::new();
    let mut cursor = start_cursor;
    let mut pages = 0u32;

    loop {
        let page = policy.run(|| fetch(cursor.clone())).await?;
        pages += 1;

        if let Some(batch) = page.items {
            items.extend(batch);
        }
        cursor = page.next_cursor;

        if let Some(limit) = ceiling {
            if items.len() >= limit {
                items.truncate(limit);
                tracing::debug!(
                    target: TRACING_TARGET_PAGE,
                    pages = pages,
                    count = items.len(),
                    resumable = cursor.is_some(),
                    "Accumulation stopped at ceiling"
                );
                break;
            }
        }

        if cursor.is_none() {
            tracing::debug!(
                target: TRACING_TARGET_PAGE,
                pages = pages,
                count = items.len(),
                "Accumulation reached end of data"
            );
            break;
        }
    }

    Ok(Accumulated {
        items,
        last_cursor: cursor,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::{BackendError, Error};

    fn policy() -> RetryPolicy {
        RetryPolicy::default().with_base_interval(std::time::Duration::from_millis(1))
    }

    /// Scripted sequence of page results, popped per fetch.
    struct Script {
        pages: Mutex<Vec<Result<Page<u32, u32>>>>,
        calls: AtomicU32,
        cursors: Mutex<Vec<Option<u32>>>,
    }

    impl Script {
        fn new(pages: Vec<Result<Page<u32, u32>>>) -> Arc<Self> {
            Arc::new(Self {
                pages: Mutex::new(pages),
                calls: AtomicU32::new(0),
                cursors: Mutex::new(Vec::new()),
            })
        }

        fn next(&self, cursor: Option<u32>) -> Result<Page<u32, u32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.cursors.lock().unwrap().push(cursor);
            self.pages.lock().unwrap().remove(0)
        }
    }

    fn page(items: &[u32], next: Option<u32>) -> Result<Page<u32, u32>> {
        Ok(Page {
            items: Some(items.to_vec()),
            next_cursor: next,
        })
    }

    #[tokio::test]
    async fn concatenates_pages_in_fetch_order() {
        let script = Script::new(vec![
            page(&[1, 2], Some(1)),
            page(&[3], Some(2)),
            page(&[4, 5], None),
        ]);
        let s = script.clone();

        let result = accumulate(&policy(), None, None, |c| {
            let s = s.clone();
            async move { s.next(c) }
        })
        .await
        .unwrap();

        assert_eq!(result.items, vec![1, 2, 3, 4, 5]);
        assert!(result.last_cursor.is_none());
        assert_eq!(
            *script.cursors.lock().unwrap(),
            vec![None, Some(1), Some(2)]
        );
    }

    #[tokio::test]
    async fn ceiling_cuts_mid_page_and_keeps_cursor() {
        let script = Script::new(vec![page(&[10, 20], Some(7))]);
        let s = script.clone();

        let result = accumulate(&policy(), None, Some(1), |c| {
            let s = s.clone();
            async move { s.next(c) }
        })
        .await
        .unwrap();

        assert_eq!(result.items, vec![10]);
        assert_eq!(result.last_cursor, Some(7));
        assert_eq!(script.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_items_field_is_an_empty_page() {
        let script = Script::new(vec![Ok(Page {
            items: None,
            next_cursor: None,
        })]);
        let s = script.clone();

        let result = accumulate(&policy(), None, None, |c| {
            let s = s.clone();
            async move { s.next(c) }
        })
        .await
        .unwrap();

        assert!(result.items.is_empty());
        assert!(result.last_cursor.is_none());
    }

    #[tokio::test]
    async fn retries_failed_page_at_its_own_cursor() {
        let script = Script::new(vec![
            page(&[1], Some(5)),
            Err(Error::backend(BackendError::retryable("throttled"))),
            page(&[2], None),
        ]);
        let s = script.clone();

        let result = accumulate(&policy(), None, None, |c| {
            let s = s.clone();
            async move { s.next(c) }
        })
        .await
        .unwrap();

        assert_eq!(result.items, vec![1, 2]);
        // The retried fetch re-used cursor 5.
        assert_eq!(
            *script.cursors.lock().unwrap(),
            vec![None, Some(5), Some(5)]
        );
    }

    #[tokio::test]
    async fn permanent_failure_discards_prior_pages() {
        let script = Script::new(vec![
            page(&[1, 2], Some(3)),
            Err(Error::backend(BackendError::new("access denied"))),
        ]);
        let s = script.clone();

        let result = accumulate(&policy(), None, None, |c| {
            let s = s.clone();
            async move { s.next(c) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(script.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn starts_from_supplied_cursor() {
        let script = Script::new(vec![page(&[9], None)]);
        let s = script.clone();

        let result = accumulate(&policy(), Some(42), None, |c| {
            let s = s.clone();
            async move { s.next(c) }
        })
        .await
        .unwrap();

        assert_eq!(result.items, vec![9]);
        assert_eq!(*script.cursors.lock().unwrap(), vec![Some(42)]);
    }
}
