//! Integration tests for the Shelf load pipeline.
//!
//! These tests drive the complete flow from dump files on disk through parsing, author
//! resolution and persistence. Tests are organized into sections:
//!
//! - **End-to-end Tests** -- Both phases against the in-memory store
//! - **Failure Tests** -- Malformed lines, missing dumps
//! - **Determinism Tests** -- Reruns and worker counts converge to the same state
//! - **Input Tests** -- BZ2 dumps, line limits
//! - **Durable Store Tests** -- The fjall-backed store, including reopen
//!
//! # Sample Data
//!
//! The fixtures mimic the Open Library dump layout (tab-separated columns, JSON last):
//! - 3 authors: "Alan Hess", "Ursula K. Le Guin", and one with no name at all
//! - 4 works: one by Alan Hess, one by an author missing from the dump, one with a
//!   repeated and a missing author, and one with no authors

use bzip2::write::BzEncoder;
use bzip2::Compression;
use shelf::config::UNKNOWN_AUTHOR;
use shelf::keyspace::KeyspaceStore;
use shelf::load::{run_load, LoadConfig};
use shelf::store::{EntityStore, MemoryStore, StoreCounts};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};
use time::macros::date;

fn dump_line(kind: &str, key: &str, json: &str) -> String {
    format!("/type/{kind}\t{key}\t1\t2008-09-08T03:23:05.850541\t{json}")
}

fn sample_authors() -> Vec<String> {
    vec![
        dump_line(
            "author",
            "/authors/OL93018A",
            r#"{"name": "Alan Hess", "personal_name": "Alan Hess", "key": "/authors/OL93018A", "type": {"key": "/type/author"}, "revision": 2}"#,
        ),
        dump_line(
            "author",
            "/authors/OL1000A",
            r#"{"name": "Ursula K. Le Guin", "key": "/authors/OL1000A", "revision": 1}"#,
        ),
        dump_line("author", "/authors/OL2000A", r#"{"key": "/authors/OL2000A"}"#),
    ]
}

fn sample_works() -> Vec<String> {
    vec![
        dump_line(
            "work",
            "/works/OL10000355W",
            r#"{"title": "Le verbe en action", "covers": [3140607], "key": "/works/OL10000355W", "authors": [{"type": {"key": "/type/author_role"}, "author": {"key": "/authors/OL3965376A"}}], "created": {"type": "/type/datetime", "value": "2009-12-11T01:57:19.964652"}}"#,
        ),
        dump_line(
            "work",
            "/works/OL1W",
            r#"{"title": "Mac OS X for Photographers", "key": "/works/OL1W", "description": {"type": "/type/text", "value": "Optimized workflow"}, "authors": [{"author": {"key": "/authors/OL93018A"}}]}"#,
        ),
        dump_line(
            "work",
            "/works/OL2W",
            r#"{"title": "The Dispossessed", "key": "/works/OL2W", "authors": [{"author": {"key": "/authors/OL1000A"}}, {"author": {"key": "/authors/OL3965376A"}}, {"author": {"key": "/authors/OL1000A"}}]}"#,
        ),
        dump_line(
            "work",
            "/works/OL3W",
            r#"{"title": "Orphan", "key": "/works/OL3W"}"#,
        ),
    ]
}

/// Helper: write lines to a temp file, one per line.
fn write_dump(lines: &[String]) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(tmp, "{}", line).unwrap();
    }
    tmp.flush().unwrap();
    tmp
}

/// Helper: write lines BZ2-compressed to a temp file named `*.bz2`.
fn write_bz2_dump(lines: &[String]) -> NamedTempFile {
    let mut encoder = BzEncoder::new(Vec::new(), Compression::fast());
    for line in lines {
        writeln!(encoder, "{}", line).unwrap();
    }
    let compressed = encoder.finish().unwrap();

    let mut tmp = tempfile::Builder::new().suffix(".bz2").tempfile().unwrap();
    tmp.write_all(&compressed).unwrap();
    tmp.flush().unwrap();
    tmp
}

fn config_for(authors: &NamedTempFile, works: &NamedTempFile, workers: usize) -> LoadConfig {
    LoadConfig {
        workers,
        ..LoadConfig::new(
            authors.path().to_str().unwrap(),
            works.path().to_str().unwrap(),
        )
    }
}

fn load_sample(workers: usize) -> MemoryStore {
    let authors = write_dump(&sample_authors());
    let works = write_dump(&sample_works());
    let store = MemoryStore::new();
    run_load(&config_for(&authors, &works, workers), &store).unwrap();
    store
}

// ---------------------------------------------------------------------------
// End-to-end tests
// ---------------------------------------------------------------------------

#[test]
fn load_stores_authors_and_books() {
    let authors = write_dump(&sample_authors());
    let works = write_dump(&sample_works());
    let store = MemoryStore::new();

    let report = run_load(&config_for(&authors, &works, 4), &store).unwrap();

    assert_eq!(report.counts, StoreCounts { authors: 3, books: 3 });
    assert_eq!(report.authors.stats.lines(), 3);
    assert_eq!(report.authors.stats.upserted(), 3);
    assert_eq!(report.works.stats.lines(), 4);
    assert_eq!(report.works.stats.upserted(), 3);
    assert_eq!(report.works.stats.skipped(), 1);
    assert_eq!(report.works.stats.unknown(), 2);
    assert_eq!(report.works.stats.failed(), 0);
}

#[test]
fn load_resolves_known_author() {
    let store = load_sample(2);

    let author = store.get_author("OL93018A").unwrap().unwrap();
    assert_eq!(author.name, "Alan Hess");
    assert_eq!(author.personal_name, "Alan Hess");

    let book = store.get_book("OL1W").unwrap().unwrap();
    assert_eq!(book.name, "Mac OS X for Photographers");
    assert_eq!(book.description.as_deref(), Some("Optimized workflow"));
    assert_eq!(book.author_ids, vec!["OL93018A"]);
    assert_eq!(book.author_names, vec!["Alan Hess"]);
}

#[test]
fn load_uses_sentinel_for_missing_author() {
    let store = load_sample(2);

    let book = store.get_book("OL10000355W").unwrap().unwrap();
    assert_eq!(book.name, "Le verbe en action");
    assert_eq!(book.cover_ids, vec!["3140607"]);
    assert_eq!(book.published_date, Some(date!(2009 - 12 - 11)));
    assert_eq!(book.description, None);
    assert_eq!(book.author_ids, vec!["OL3965376A"]);
    assert_eq!(book.author_names, vec![UNKNOWN_AUTHOR]);
    assert_eq!(store.get_author("OL3965376A").unwrap(), None);
}

#[test]
fn load_keeps_author_order_and_duplicates() {
    let store = load_sample(2);

    let book = store.get_book("OL2W").unwrap().unwrap();
    assert_eq!(book.author_ids, vec!["OL1000A", "OL3965376A", "OL1000A"]);
    assert_eq!(
        book.author_names,
        vec!["Ursula K. Le Guin", UNKNOWN_AUTHOR, "Ursula K. Le Guin"]
    );
}

#[test]
fn load_skips_works_without_authors() {
    let store = load_sample(2);
    assert_eq!(store.get_book("OL3W").unwrap(), None);
}

#[test]
fn load_keeps_author_with_empty_fields() {
    let store = load_sample(2);

    let author = store.get_author("OL2000A").unwrap().unwrap();
    assert_eq!(author.name, "");
    assert_eq!(author.personal_name, "");
}

#[test]
fn load_keeps_author_with_structured_fields() {
    let mut lines = sample_authors();
    lines.push(dump_line(
        "author",
        "/authors/OL5A",
        r#"{"key": "/authors/OL5A", "name": {"value": "Odd"}, "personal_name": ["P"]}"#,
    ));
    let authors = write_dump(&lines);
    let works = write_dump(&sample_works());
    let store = MemoryStore::new();

    let report = run_load(&config_for(&authors, &works, 1), &store).unwrap();

    assert_eq!(report.authors.stats.upserted(), 4);
    assert_eq!(report.authors.stats.parse_failed(), 0);
    let author = store.get_author("OL5A").unwrap().unwrap();
    assert_eq!(author.name, r#"{"value":"Odd"}"#);
    assert_eq!(author.personal_name, r#"["P"]"#);
}

#[test]
fn every_stored_book_has_aligned_names() {
    let store = load_sample(4);
    let (_, books) = store.snapshot();

    assert_eq!(books.len(), 3);
    for book in books {
        assert!(!book.author_ids.is_empty());
        assert_eq!(book.author_ids.len(), book.author_names.len());
    }
}

// ---------------------------------------------------------------------------
// Failure tests
// ---------------------------------------------------------------------------

#[test]
fn malformed_lines_do_not_stop_the_load() {
    let mut author_lines = vec!["this line has no json".to_string()];
    author_lines.extend(sample_authors());
    author_lines.push(dump_line("author", "/authors/OL9A", r#"{"key": "/authors/OL9A", "#));

    let mut work_lines = vec![dump_line(
        "work",
        "/works/OL8W",
        r#"{"key": "/works/OL8W", "title": ["not", "a", "string"], "authors": [{"author": {"key": "/authors/OL1000A"}}]}"#,
    )];
    work_lines.push(dump_line(
        "work",
        "/works/OL7W",
        r#"{"key": "/works/OL7W", "created": {"value": "yesterday"}, "authors": [{"author": {"key": "/authors/OL1000A"}}]}"#,
    ));
    work_lines.extend(sample_works());

    let authors = write_dump(&author_lines);
    let works = write_dump(&work_lines);
    let store = MemoryStore::new();

    let report = run_load(&config_for(&authors, &works, 2), &store).unwrap();

    assert_eq!(report.authors.stats.parse_failed(), 2);
    assert_eq!(report.authors.stats.upserted(), 3);
    assert_eq!(report.works.stats.parse_failed(), 2);
    assert_eq!(report.works.stats.upserted(), 3);
    assert_eq!(store.get_book("OL8W").unwrap(), None);
    assert_eq!(store.get_book("OL7W").unwrap(), None);
    assert!(store.get_book("OL1W").unwrap().is_some());
}

#[test]
fn missing_authors_dump_aborts() {
    let works = write_dump(&sample_works());
    let store = MemoryStore::new();
    let config = LoadConfig::new("/nonexistent/authors.txt", works.path().to_str().unwrap());

    let err = run_load(&config, &store).err().unwrap();
    assert!(format!("{err:#}").contains("/nonexistent/authors.txt"));
    assert_eq!(store.counts().unwrap(), StoreCounts::default());
}

#[test]
fn missing_works_dump_keeps_loaded_authors() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("store");
    let store_path = store_path.to_str().unwrap();
    let authors = write_dump(&sample_authors());

    {
        let store = KeyspaceStore::open(store_path).unwrap();
        let config = LoadConfig::new(authors.path().to_str().unwrap(), "/nonexistent/works.txt");

        let err = run_load(&config, &store).err().unwrap();
        assert!(format!("{err:#}").contains("/nonexistent/works.txt"));
    }

    let store = KeyspaceStore::open(store_path).unwrap();
    assert_eq!(store.counts().unwrap(), StoreCounts { authors: 3, books: 0 });
}

// ---------------------------------------------------------------------------
// Determinism tests
// ---------------------------------------------------------------------------

#[test]
fn rerun_yields_same_state() {
    let authors = write_dump(&sample_authors());
    let works = write_dump(&sample_works());
    let config = config_for(&authors, &works, 4);
    let store = MemoryStore::new();

    run_load(&config, &store).unwrap();
    let first = store.snapshot();
    run_load(&config, &store).unwrap();

    assert_eq!(store.snapshot(), first);
}

#[test]
fn worker_count_does_not_change_state() {
    assert_eq!(load_sample(1).snapshot(), load_sample(8).snapshot());
}

#[test]
fn later_duplicate_author_wins_sequentially() {
    let mut lines = sample_authors();
    lines.push(dump_line(
        "author",
        "/authors/OL93018A",
        r#"{"name": "A. Hess", "key": "/authors/OL93018A"}"#,
    ));
    let authors = write_dump(&lines);
    let works = write_dump(&sample_works());
    let store = MemoryStore::new();

    run_load(&config_for(&authors, &works, 1), &store).unwrap();

    assert_eq!(store.get_author("OL93018A").unwrap().unwrap().name, "A. Hess");
    assert_eq!(
        store.get_book("OL1W").unwrap().unwrap().author_names,
        vec!["A. Hess"]
    );
}

// ---------------------------------------------------------------------------
// Input tests
// ---------------------------------------------------------------------------

#[test]
fn bz2_dumps_load_like_plain_ones() {
    let authors = write_bz2_dump(&sample_authors());
    let works = write_bz2_dump(&sample_works());
    let store = MemoryStore::new();

    run_load(&config_for(&authors, &works, 2), &store).unwrap();

    assert_eq!(store.snapshot(), load_sample(2).snapshot());
}

#[test]
fn blank_lines_are_ignored() {
    let mut lines = vec![String::new()];
    for line in sample_authors() {
        lines.push(line);
        lines.push("   ".to_string());
    }
    let authors = write_dump(&lines);
    let works = write_dump(&sample_works());
    let store = MemoryStore::new();

    let report = run_load(&config_for(&authors, &works, 2), &store).unwrap();

    assert_eq!(report.authors.stats.lines(), 3);
    assert_eq!(report.authors.stats.parse_failed(), 0);
}

#[test]
fn limit_applies_to_each_phase() {
    let authors = write_dump(&sample_authors());
    let works = write_dump(&sample_works());
    let store = MemoryStore::new();
    let config = LoadConfig {
        limit: Some(1),
        ..config_for(&authors, &works, 1)
    };

    let report = run_load(&config, &store).unwrap();

    assert_eq!(report.authors.stats.lines(), 1);
    assert_eq!(report.works.stats.lines(), 1);
    assert_eq!(report.counts, StoreCounts { authors: 1, books: 1 });
    assert!(store.get_author("OL93018A").unwrap().is_some());
    assert!(store.get_book("OL10000355W").unwrap().is_some());
}

// ---------------------------------------------------------------------------
// Durable store tests
// ---------------------------------------------------------------------------

#[test]
fn keyspace_load_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().to_str().unwrap();
    let authors = write_dump(&sample_authors());
    let works = write_dump(&sample_works());

    {
        let store = KeyspaceStore::open(store_path).unwrap();
        let report = run_load(&config_for(&authors, &works, 4), &store).unwrap();
        assert_eq!(report.counts, StoreCounts { authors: 3, books: 3 });
    }

    let store = KeyspaceStore::open(store_path).unwrap();
    let book = store.get_book("OL2W").unwrap().unwrap();
    assert_eq!(
        book.author_names,
        vec!["Ursula K. Le Guin", UNKNOWN_AUTHOR, "Ursula K. Le Guin"]
    );
    assert_eq!(store.get_book("OL3W").unwrap(), None);
}

#[test]
fn keyspace_matches_memory_store() {
    let dir = TempDir::new().unwrap();
    let authors = write_dump(&sample_authors());
    let works = write_dump(&sample_works());
    let store = KeyspaceStore::open(dir.path().to_str().unwrap()).unwrap();

    run_load(&config_for(&authors, &works, 2), &store).unwrap();

    let (expected_authors, expected_books) = load_sample(2).snapshot();
    for author in expected_authors {
        assert_eq!(store.get_author(&author.id).unwrap(), Some(author));
    }
    for book in expected_books {
        assert_eq!(store.get_book(&book.id).unwrap(), Some(book));
    }
}
