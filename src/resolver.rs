use crate::config::{RESOLVER_CACHE_CAPACITY, UNKNOWN_AUTHOR};
use crate::store::EntityStore;
use anyhow::Result;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Resolves author ids to display names against the authors collection.
///
/// Only reads the store. Results, including misses, are memoized up to
/// `capacity` entries; this is sound only while nothing writes authors,
/// which holds for the whole works phase.
pub struct AuthorResolver<'a, S: ?Sized> {
    store: &'a S,
    names: DashMap<String, Option<String>, FxBuildHasher>,
    capacity: usize,
    store_reads: AtomicU64,
    unknown: AtomicU64,
}

impl<'a, S> AuthorResolver<'a, S>
where
    S: EntityStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self::with_capacity(store, RESOLVER_CACHE_CAPACITY)
    }

    pub fn with_capacity(store: &'a S, capacity: usize) -> Self {
        Self {
            store,
            names: DashMap::default(),
            capacity,
            store_reads: AtomicU64::new(0),
            unknown: AtomicU64::new(0),
        }
    }

    /// Returns one name per id, in input order. Ids with no stored author
    /// resolve to [`UNKNOWN_AUTHOR`].
    pub fn resolve(&self, ids: &[String]) -> Result<Vec<String>> {
        let mut resolved: Vec<Option<Option<String>>> =
            ids.iter().map(|id| self.cached(id)).collect();

        let misses: Vec<String> = ids
            .iter()
            .zip(&resolved)
            .filter(|(_, hit)| hit.is_none())
            .map(|(id, _)| id.clone())
            .collect();

        if !misses.is_empty() {
            let found = self.store.get_authors(&misses)?;
            self.store_reads
                .fetch_add(misses.len() as u64, Ordering::Relaxed);

            let mut found = misses.into_iter().zip(found);
            for slot in resolved.iter_mut().filter(|slot| slot.is_none()) {
                if let Some((id, author)) = found.next() {
                    let name = author.map(|a| a.name);
                    if name.is_none() {
                        debug!(author_id = %id, "Author not loaded");
                    }
                    self.remember(id, name.clone());
                    *slot = Some(name);
                }
            }
        }

        Ok(resolved
            .into_iter()
            .map(|slot| match slot.flatten() {
                Some(name) => name,
                None => {
                    self.unknown.fetch_add(1, Ordering::Relaxed);
                    UNKNOWN_AUTHOR.to_string()
                }
            })
            .collect())
    }

    fn cached(&self, id: &str) -> Option<Option<String>> {
        self.names.get(id).map(|entry| entry.value().clone())
    }

    fn remember(&self, id: String, name: Option<String>) {
        if self.names.len() < self.capacity {
            self.names.insert(id, name);
        }
    }

    /// Point reads issued against the store so far.
    pub fn store_reads(&self) -> u64 {
        self.store_reads.load(Ordering::Relaxed)
    }

    /// References that fell back to the sentinel so far.
    pub fn unknown_references(&self) -> u64 {
        self.unknown.load(Ordering::Relaxed)
    }
}
