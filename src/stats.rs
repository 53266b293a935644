use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Counters updated by crawl tasks as they finish.
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_saved: AtomicUsize,
    resources_saved: AtomicUsize,
    resources_skipped: AtomicUsize,
    failures: AtomicUsize,
}

impl CrawlStats {
    pub fn page_saved(&self) {
        self.pages_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn resource_saved(&self) {
        self.resources_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn resource_skipped(&self) {
        self.resources_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self, urls_claimed: usize, timed_out: bool, elapsed: Duration) -> CrawlSummary {
        CrawlSummary {
            pages_saved: self.pages_saved.load(Ordering::Relaxed),
            resources_saved: self.resources_saved.load(Ordering::Relaxed),
            resources_skipped: self.resources_skipped.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            urls_claimed,
            timed_out,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }
}

/// Outcome of one run, printed at exit and optionally written as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlSummary {
    pub pages_saved: usize,
    pub resources_saved: usize,
    /// Foreign-host resources and resources already on disk.
    pub resources_skipped: usize,
    pub failures: usize,
    pub urls_claimed: usize,
    pub timed_out: bool,
    pub elapsed_secs: f64,
}

impl CrawlSummary {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
