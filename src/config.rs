/// Namespace prefix on author keys (`/authors/OL93018A`)
pub const AUTHOR_KEY_PREFIX: &str = "/authors/";

/// Namespace prefix on work keys (`/works/OL10000355W`)
pub const WORK_KEY_PREFIX: &str = "/works/";

/// Display name substituted when a referenced author was never loaded
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Progress update interval (tick every N lines)
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Read buffer for dump files
pub const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Upper bound on memoized author names held by the resolver
pub const RESOLVER_CACHE_CAPACITY: usize = 1_000_000;

/// Partition names in the durable store
pub const AUTHORS_PARTITION: &str = "authors";
pub const BOOKS_PARTITION: &str = "books";

/// Default store directory when none is configured
pub const DEFAULT_STORE_DIR: &str = "shelf-store";
