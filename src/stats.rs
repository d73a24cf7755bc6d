use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected while loading one dump.
#[derive(Default)]
pub struct PhaseStats {
    pub lines_read: AtomicU64,
    pub records_upserted: AtomicU64,
    pub parse_failures: AtomicU64,
    pub store_failures: AtomicU64,
    pub skipped_without_authors: AtomicU64,
    pub unknown_authors: AtomicU64,
    pub author_lookups: AtomicU64,
}

impl PhaseStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_lines(&self) -> u64 {
        self.lines_read.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_upserted(&self) {
        self.records_upserted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_parse_failures(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_store_failures(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.skipped_without_authors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_unknown_authors(&self, count: u64) {
        self.unknown_authors.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_author_lookups(&self, count: u64) {
        self.author_lookups.fetch_add(count, Ordering::Relaxed);
    }

    pub fn lines(&self) -> u64 {
        self.lines_read.load(Ordering::Relaxed)
    }

    pub fn upserted(&self) -> u64 {
        self.records_upserted.load(Ordering::Relaxed)
    }

    pub fn parse_failed(&self) -> u64 {
        self.parse_failures.load(Ordering::Relaxed)
    }

    pub fn store_failed(&self) -> u64 {
        self.store_failures.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped_without_authors.load(Ordering::Relaxed)
    }

    pub fn unknown(&self) -> u64 {
        self.unknown_authors.load(Ordering::Relaxed)
    }

    /// Author reads that went to the store rather than the resolver memo.
    pub fn lookups(&self) -> u64 {
        self.author_lookups.load(Ordering::Relaxed)
    }

    /// Lines that produced no record.
    pub fn failed(&self) -> u64 {
        self.parse_failed() + self.store_failed()
    }
}
