//! Biblical-term dictionary engine: sharded distribution, lazy loading and
//! verse-level word lookup.
//!
//! The dictionary is a flat map of `{book}_{chapter}_{verse}_{token}` keys
//! to lexical entries. At build time it is split into per-chapter shard
//! files plus a content-addressed index; at runtime shards are fetched
//! lazily, memoized and matched against verse text.
//!
//! # Modules
//!
//! - `builder` - Offline shard builder producing the artifact tree
//! - `loader` - Memoized index/chapter loader with legacy fallback
//! - `matcher` - Finds all dictionary occurrences in a verse
//! - `resolver` - Tiered entry lookup for an explicitly selected word
//! - `warmup` - Bulk shard pre-download into the persistent cache
//! - `fetch` / `cache` - Transport and persistence seams
//! - `key` / `normalize` / `models` / `error` - Shared foundations

pub mod builder;
pub mod cache;
pub mod error;
pub mod fetch;
pub mod key;
pub mod loader;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod resolver;
pub mod warmup;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{DictionaryError, Result};

pub use builder::{BuildReport, ShardBuilder};
pub use cache::{FsCache, PersistentCache};
pub use fetch::{FsFetcher, HttpFetcher, ShardFetcher};
pub use key::{book_key_for_abbrev, is_valid_strong, DictionaryKey};
pub use loader::{DictionaryLoader, INDEX_PATH, LEGACY_DICTIONARY_PATH};
pub use matcher::{available_words_for_verse, find_words_in_verse, VerseMatch};
pub use models::{
    ChapterShard, DictionaryEntry, DictionaryIndex, SyncComplete, WarmupPhase, WarmupStatus,
};
pub use resolver::{get_entry, has_entry};
pub use warmup::{
    FsStatusStore, MemoryStatusStore, WarmupOptions, WarmupService, WarmupStatusStore,
};
