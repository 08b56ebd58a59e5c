use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::OnceCell;

/// Run-scoped memo of key -> resolved value (an empty string means "checked, nothing found").
///
/// Every key owns a `OnceCell`, so a second request for a key that is still
/// being resolved waits for the first one instead of starting its own fetch.
#[derive(Default)]
pub struct ResolutionCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &str) -> Arc<OnceCell<String>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key.to_string()).or_default().clone()
    }

    /// Cached value for `key`, running `resolve` only if nobody has resolved it yet.
    pub async fn get_or_resolve<F, Fut>(&self, key: &str, resolve: F) -> String
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = String>,
    {
        self.cell(key).get_or_init(resolve).await.clone()
    }

    /// Number of settled entries as `(total, non_empty)`.
    pub fn stats(&self) -> (usize, usize) {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .values()
            .filter_map(|cell| cell.get())
            .fold((0, 0), |(total, hits), value| {
                (total + 1, hits + usize::from(!value.is_empty()))
            })
    }
}
