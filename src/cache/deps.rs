//! Tag collector for response cache invalidation.
//!
//! The response cache middleware opens a task-local collector around each
//! page handler. Services call [`record`] with the tags of the data they
//! read, and the middleware stores the collected set next to the cached
//! response.

use std::cell::RefCell;
use std::collections::HashSet;
use std::future::Future;

tokio::task_local! {
    static TAGS: RefCell<HashSet<String>>;
}

/// Record a cache tag for the response being built.
///
/// Outside a collector this is a no-op.
pub fn record(tag: impl Into<String>) {
    let tag = tag.into();
    let _ = TAGS.try_with(|tags| {
        tags.borrow_mut().insert(tag);
    });
}

/// Tags recorded so far in the current collector.
pub fn collect() -> HashSet<String> {
    TAGS.try_with(|tags| tags.borrow().clone())
        .unwrap_or_default()
}

/// Run `f` inside a fresh collector and return its output with the tags it
/// recorded.
pub async fn with_collector<F, R>(f: F) -> (R, HashSet<String>)
where
    F: Future<Output = R>,
{
    TAGS.scope(RefCell::new(HashSet::new()), async move {
        let result = f.await;
        (result, collect())
    })
    .await
}
