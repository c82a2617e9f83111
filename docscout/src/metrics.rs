use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Counters shared by every scan of one run.
///
/// Clones share the same counters, so the matcher, the scanners and the
/// orchestrator can each hold one.
#[derive(Debug, Clone, Default)]
pub struct ScanMetrics {
    // Matcher cache
    cache_hits: Arc<AtomicU64>,
    cache_misses: Arc<AtomicU64>,

    // Extraction
    bytes_read: Arc<AtomicU64>,
    fragments_scanned: Arc<AtomicU64>,
    pages_recovered: Arc<AtomicU64>,

    // Per-file outcomes
    early_exits: Arc<AtomicU64>,
    timeouts: Arc<AtomicU64>,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a matcher cache lookup
    pub fn record_cache_lookup(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_bytes_read(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_fragment(&self) {
        self.fragments_scanned.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a page that failed to decode and was skipped
    pub fn record_page_recovered(&self) {
        self.pages_recovered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_early_exit(&self) {
        self.early_exits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Takes a consistent-enough snapshot of all counters
    pub fn get_stats(&self) -> ScanStats {
        ScanStats {
            cache_hits: self.cache_hits(),
            cache_misses: self.cache_misses(),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            fragments_scanned: self.fragments_scanned.load(Ordering::Relaxed),
            pages_recovered: self.pages_recovered.load(Ordering::Relaxed),
            early_exits: self.early_exits.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Scan stats:\n\
             Bytes read: {}\n\
             Fragments scanned: {}\n\
             Matcher cache hits/misses: {}/{}\n\
             Pages skipped after decode errors: {}\n\
             Early exits: {}\n\
             Timeouts: {}",
            stats.bytes_read,
            stats.fragments_scanned,
            stats.cache_hits,
            stats.cache_misses,
            stats.pages_recovered,
            stats.early_exits,
            stats.timeouts
        );
    }
}

/// Point-in-time copy of [`ScanMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub bytes_read: u64,
    pub fragments_scanned: u64,
    pub pages_recovered: u64,
    pub early_exits: u64,
    pub timeouts: u64,
}
