use serde::{Deserialize, Serialize};
use time::Date;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpKind {
    Authors,
    Works,
}

impl DumpKind {
    pub fn label(&self) -> &'static str {
        match self {
            DumpKind::Authors => "authors",
            DumpKind::Works => "works",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub personal_name: String,
}

/// A work record. `author_names` is a load-time snapshot, index-aligned with `author_ids`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub published_date: Option<Date>,
    pub cover_ids: Vec<String>,
    pub author_ids: Vec<String>,
    pub author_names: Vec<String>,
}

impl Book {
    pub fn has_authors(&self) -> bool {
        !self.author_ids.is_empty()
    }
}
