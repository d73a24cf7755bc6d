use crate::models::{Author, Book};
use anyhow::Result;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub authors: u64,
    pub books: u64,
}

/// Keyed persistence for the two collections.
///
/// Upserts overwrite whatever is stored under the same id, so calling them
/// again with the same record is harmless. Lookups return `Ok(None)` for
/// unknown ids. Implementations must tolerate concurrent callers.
pub trait EntityStore: Send + Sync {
    fn upsert_author(&self, author: &Author) -> Result<()>;

    fn get_author(&self, id: &str) -> Result<Option<Author>>;

    fn upsert_book(&self, book: &Book) -> Result<()>;

    fn get_book(&self, id: &str) -> Result<Option<Book>>;

    /// One result per id, in the order given.
    fn get_authors(&self, ids: &[String]) -> Result<Vec<Option<Author>>> {
        ids.iter().map(|id| self.get_author(id)).collect()
    }

    /// Makes every upsert issued so far durable and visible to readers.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn counts(&self) -> Result<StoreCounts>;
}

/// In-process store, used for dry runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    authors: DashMap<String, Author, FxBuildHasher>,
    books: DashMap<String, Book, FxBuildHasher>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records sorted by id.
    pub fn snapshot(&self) -> (Vec<Author>, Vec<Book>) {
        let mut authors: Vec<Author> = self.authors.iter().map(|e| e.value().clone()).collect();
        let mut books: Vec<Book> = self.books.iter().map(|e| e.value().clone()).collect();
        authors.sort_by(|a, b| a.id.cmp(&b.id));
        books.sort_by(|a, b| a.id.cmp(&b.id));
        (authors, books)
    }
}

impl EntityStore for MemoryStore {
    fn upsert_author(&self, author: &Author) -> Result<()> {
        self.authors.insert(author.id.clone(), author.clone());
        Ok(())
    }

    fn get_author(&self, id: &str) -> Result<Option<Author>> {
        Ok(self.authors.get(id).map(|entry| entry.value().clone()))
    }

    fn upsert_book(&self, book: &Book) -> Result<()> {
        self.books.insert(book.id.clone(), book.clone());
        Ok(())
    }

    fn get_book(&self, id: &str) -> Result<Option<Book>> {
        Ok(self.books.get(id).map(|entry| entry.value().clone()))
    }

    fn counts(&self) -> Result<StoreCounts> {
        Ok(StoreCounts {
            authors: self.authors.len() as u64,
            books: self.books.len() as u64,
        })
    }
}
