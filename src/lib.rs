//! Shelf: Open Library dump loader
//!
//! This crate loads the Open Library authors and works dumps into an embedded
//! key-value store in two phases:
//!
//! 1. **Authors Phase** -- Stream the authors dump and upsert one `Author` per line
//! 2. **Works Phase** -- Stream the works dump, resolve each work's author ids to display
//!    names against the stored authors, and upsert one `Book` per work that has authors
//!
//! The store is flushed between the phases, so every author is durable and visible before
//! the first work is resolved.
//!
//! # Architecture
//!
//! - **Streaming reads** -- Dumps are read line by line, plain or `.bz2` compressed
//! - **Parallel lines** -- A rayon pool handles lines concurrently within a phase
//! - **Tolerant parsing** -- A bad line is logged and counted, never fatal
//! - **Idempotent upserts** -- Records are keyed by id, so reruns converge to the same state
//! - **Atomic operations** -- Lock-free counters for per-phase statistics
//!
//! # Key Modules
//!
//! - [`parser`] -- Line reader with BZ2 decompression
//! - [`record`] -- Dump line to `Author` / `Book` extraction
//! - [`resolver`] -- Author id to display name lookup with memoization
//! - [`store`] -- `EntityStore` trait and the in-memory store
//! - [`keyspace`] -- Durable store on fjall
//! - [`load`] -- The two-phase load pipeline
//! - [`models`] -- Core data types (Author, Book)
//! - [`error`] -- Per-line parse errors
//! - [`stats`] -- Thread-safe atomic counters
//! - [`config`] -- Constants
//!
//! # Example Usage
//!
//! ```bash
//! shelf load --authors ol_dump_authors_latest.txt.bz2 --works ol_dump_works_latest.txt.bz2
//!
//! # Sample the first 10k lines of each dump without writing anything
//! shelf load --authors authors.txt --works works.txt --limit 10000 --dry-run
//! ```

pub mod config;
pub mod error;
pub mod keyspace;
pub mod load;
pub mod models;
pub mod parser;
pub mod record;
pub mod resolver;
pub mod stats;
pub mod store;
