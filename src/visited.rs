use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Run-wide set of URLs that some task has claimed.
///
/// Entries are never removed. The only way in is [`VisitedSet::claim`], which
/// tests and inserts under one lock.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` iff this call inserted `url`, i.e. the caller now owns it.
    pub fn claim(&self, url: &str) -> bool {
        let mut urls = self.urls.lock().unwrap_or_else(PoisonError::into_inner);
        if urls.contains(url) {
            return false;
        }
        urls.insert(url.to_string())
    }

    pub fn len(&self) -> usize {
        self.urls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
