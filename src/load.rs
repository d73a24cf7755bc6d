use crate::config::PROGRESS_INTERVAL;
use crate::models::DumpKind;
use crate::parser::{DumpLine, DumpReader};
use crate::record;
use crate::resolver::AuthorResolver;
use crate::stats::PhaseStats;
use crate::store::{EntityStore, StoreCounts};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct LoadConfig {
    pub authors_path: String,
    pub works_path: String,
    /// Worker threads per phase. With 1, lines are handled in dump order.
    pub workers: usize,
    /// Maximum number of records read from each dump.
    pub limit: Option<u64>,
}

impl LoadConfig {
    pub fn new(authors_path: impl Into<String>, works_path: impl Into<String>) -> Self {
        Self {
            authors_path: authors_path.into(),
            works_path: works_path.into(),
            workers: default_workers(),
            limit: None,
        }
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub struct PhaseReport {
    pub stats: PhaseStats,
    pub duration: Duration,
}

pub struct LoadReport {
    pub authors: PhaseReport,
    pub works: PhaseReport,
    pub counts: StoreCounts,
}

/// Loads the authors dump, persists it, then loads the works dump.
///
/// Works are never resolved before every author line has been handled and
/// the store has been flushed. Bad lines are logged and counted; only an
/// unreadable dump or a failed flush aborts the run.
pub fn run_load<S>(config: &LoadConfig, store: &S) -> Result<LoadReport>
where
    S: EntityStore + ?Sized,
{
    let pool = build_pool(config.workers)?;

    let authors = load_authors(&config.authors_path, store, pool.as_ref(), config.limit)?;
    store.flush().context("Failed to persist authors")?;

    let works = load_works(&config.works_path, store, pool.as_ref(), config.limit)?;
    store.flush().context("Failed to persist works")?;

    let counts = store.counts()?;
    info!(
        authors = counts.authors,
        books = counts.books,
        "Load complete"
    );

    Ok(LoadReport {
        authors,
        works,
        counts,
    })
}

/// Pool for parallel phases. `None` for a single worker, whose lines run on
/// the calling thread.
pub fn build_pool(workers: usize) -> Result<Option<ThreadPool>> {
    if workers <= 1 {
        return Ok(None);
    }

    ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("shelf-load-{i}"))
        .build()
        .map(Some)
        .context("Failed to build worker pool")
}

pub fn load_authors<S>(
    path: &str,
    store: &S,
    pool: Option<&ThreadPool>,
    limit: Option<u64>,
) -> Result<PhaseReport>
where
    S: EntityStore + ?Sized,
{
    let stats = PhaseStats::new();
    let start = Instant::now();

    run_phase(DumpKind::Authors, path, pool, limit, &stats, |line| {
        let author = match record::parse_author(&line.bytes) {
            Ok(author) => author,
            Err(e) => {
                stats.inc_parse_failures();
                warn!(line = line.number, error = %e, "Skipping malformed author record");
                return;
            }
        };

        match store.upsert_author(&author) {
            Ok(()) => {
                stats.inc_upserted();
                debug!(id = %author.id, "Author saved");
            }
            Err(e) => {
                stats.inc_store_failures();
                warn!(line = line.number, id = %author.id, error = %format!("{e:#}"), "Failed to save author");
            }
        }
    })?;

    Ok(finish_phase(DumpKind::Authors, stats, start))
}

pub fn load_works<S>(
    path: &str,
    store: &S,
    pool: Option<&ThreadPool>,
    limit: Option<u64>,
) -> Result<PhaseReport>
where
    S: EntityStore + ?Sized,
{
    let stats = PhaseStats::new();
    let start = Instant::now();
    let resolver = AuthorResolver::new(store);

    run_phase(DumpKind::Works, path, pool, limit, &stats, |line| {
        let mut book = match record::parse_work(&line.bytes) {
            Ok(book) => book,
            Err(e) => {
                stats.inc_parse_failures();
                warn!(line = line.number, error = %e, "Skipping malformed work record");
                return;
            }
        };

        if !book.has_authors() {
            stats.inc_skipped();
            debug!(line = line.number, id = %book.id, "Skipping work without authors");
            return;
        }

        book.author_names = match resolver.resolve(&book.author_ids) {
            Ok(names) => names,
            Err(e) => {
                stats.inc_store_failures();
                warn!(line = line.number, id = %book.id, error = %format!("{e:#}"), "Failed to resolve authors");
                return;
            }
        };

        match store.upsert_book(&book) {
            Ok(()) => {
                stats.inc_upserted();
                debug!(id = %book.id, authors = book.author_ids.len(), "Book saved");
            }
            Err(e) => {
                stats.inc_store_failures();
                warn!(line = line.number, id = %book.id, error = %format!("{e:#}"), "Failed to save book");
            }
        }
    })?;

    stats.add_unknown_authors(resolver.unknown_references());
    stats.add_author_lookups(resolver.store_reads());
    Ok(finish_phase(DumpKind::Works, stats, start))
}

/// Streams one dump through `handle`. Only I/O errors stop the phase.
fn run_phase<F>(
    kind: DumpKind,
    path: &str,
    pool: Option<&ThreadPool>,
    limit: Option<u64>,
    stats: &PhaseStats,
    handle: F,
) -> Result<()>
where
    F: Fn(&DumpLine) + Send + Sync,
{
    let reader = DumpReader::open(path)?;
    let cap = limit.map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
    let mut lines = reader.take(cap);

    info!(path, dump = kind.label(), "Loading dump");
    let pb = ProgressBar::new_spinner();

    let step = |line: std::io::Result<DumpLine>| -> Result<()> {
        let line =
            line.with_context(|| format!("Failed to read {} dump at: {}", kind.label(), path))?;
        let seen = stats.inc_lines();
        if seen % PROGRESS_INTERVAL == 0 {
            pb.set_message(format!("{} {} lines", seen, kind.label()));
            pb.tick();
        }
        handle(&line);
        Ok(())
    };

    let result = match pool {
        Some(pool) => pool.install(|| lines.par_bridge().try_for_each(step)),
        None => lines.try_for_each(step),
    };

    pb.finish_and_clear();
    result
}

fn finish_phase(kind: DumpKind, stats: PhaseStats, start: Instant) -> PhaseReport {
    let duration = start.elapsed();
    info!(
        dump = kind.label(),
        lines = stats.lines(),
        upserted = stats.upserted(),
        parse_failures = stats.parse_failed(),
        store_failures = stats.store_failed(),
        skipped = stats.skipped(),
        unknown_authors = stats.unknown(),
        author_lookups = stats.lookups(),
        duration_secs = duration.as_secs_f64(),
        "Phase complete"
    );
    PhaseReport { stats, duration }
}
