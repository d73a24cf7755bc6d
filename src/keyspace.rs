use crate::config::{AUTHORS_PARTITION, BOOKS_PARTITION};
use crate::models::{Author, Book};
use crate::store::{EntityStore, StoreCounts};
use anyhow::{Context, Result};
use bincode::Options;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

/// Durable store on an embedded LSM keyspace, one partition per collection.
/// Keys are entity ids, values are bincode-encoded records.
pub struct KeyspaceStore {
    keyspace: Keyspace,
    authors: PartitionHandle,
    books: PartitionHandle,
}

impl KeyspaceStore {
    pub fn open(dir: &str) -> Result<Self> {
        let keyspace = Config::new(dir)
            .open()
            .with_context(|| format!("Failed to open store at: {}", dir))?;

        let authors = keyspace
            .open_partition(AUTHORS_PARTITION, PartitionCreateOptions::default())
            .context("Failed to open authors partition")?;
        let books = keyspace
            .open_partition(BOOKS_PARTITION, PartitionCreateOptions::default())
            .context("Failed to open books partition")?;

        info!(path = dir, "Store opened");

        Ok(Self {
            keyspace,
            authors,
            books,
        })
    }

    fn put<T: Serialize>(partition: &PartitionHandle, id: &str, value: &T) -> Result<()> {
        partition
            .insert(id.as_bytes(), encode(value)?)
            .with_context(|| format!("Failed to write record: {}", id))
    }

    fn fetch<T: DeserializeOwned>(partition: &PartitionHandle, id: &str) -> Result<Option<T>> {
        match partition
            .get(id.as_bytes())
            .with_context(|| format!("Failed to read record: {}", id))?
        {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::DefaultOptions::new()
        .serialize(value)
        .context("Failed to encode record")
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::DefaultOptions::new()
        .deserialize(bytes)
        .context("Failed to decode record")
}

impl EntityStore for KeyspaceStore {
    fn upsert_author(&self, author: &Author) -> Result<()> {
        Self::put(&self.authors, &author.id, author)
    }

    fn get_author(&self, id: &str) -> Result<Option<Author>> {
        Self::fetch(&self.authors, id)
    }

    fn upsert_book(&self, book: &Book) -> Result<()> {
        Self::put(&self.books, &book.id, book)
    }

    fn get_book(&self, id: &str) -> Result<Option<Book>> {
        Self::fetch(&self.books, id)
    }

    fn flush(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist store")?;
        debug!("Store persisted");
        Ok(())
    }

    fn counts(&self) -> Result<StoreCounts> {
        Ok(StoreCounts {
            authors: self.authors.len().context("Failed to count authors")? as u64,
            books: self.books.len().context("Failed to count books")? as u64,
        })
    }
}
