//! Runtime index/chapter loader with memoization and legacy fallback.
//!
//! All caches live on the loader instance, so independent loaders can
//! coexist (and be thrown away to reset state in tests). Chapter and index
//! loads never fail from the caller's point of view: a fetch failure
//! degrades to the legacy monolithic dictionary, and a failed legacy load
//! degrades to an empty shard.
//!
//! Request coalescing: each cache slot is a `tokio::sync::OnceCell`, so
//! concurrent loads of the same chapter share a single underlying fetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

use super::error::Result;
use super::fetch::ShardFetcher;
use super::key::book_key_for_abbrev;
use super::models::{
    sanitize_shard, ChapterShard, DictionaryIndex, IndexBook, IndexChapter,
};

/// Index path within the published artifact tree.
pub const INDEX_PATH: &str = "/data/dictionary/index.json";

/// Pre-sharding monolithic dictionary, kept as the fallback artifact.
pub const LEGACY_DICTIONARY_PATH: &str = "/dicionario_completo.json";

type ShardCell = Arc<OnceCell<Arc<ChapterShard>>>;

/// Lazily fetches and caches the dictionary index and chapter shards.
pub struct DictionaryLoader<F: ShardFetcher> {
    fetcher: Arc<F>,
    index: OnceCell<Arc<DictionaryIndex>>,
    legacy: OnceCell<Arc<ChapterShard>>,
    chapters: Mutex<HashMap<String, ShardCell>>,
    verse_keys: Mutex<HashMap<String, Arc<Vec<String>>>>,
}

impl<F: ShardFetcher> DictionaryLoader<F> {
    pub fn new(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            index: OnceCell::new(),
            legacy: OnceCell::new(),
            chapters: Mutex::new(HashMap::new()),
            verse_keys: Mutex::new(HashMap::new()),
        }
    }

    /// The fetcher this loader reads through.
    pub fn fetcher(&self) -> Arc<F> {
        Arc::clone(&self.fetcher)
    }

    /// Fetch the index once and memoize it for the process lifetime. On
    /// failure, synthesize an equivalent index from the legacy monolith;
    /// callers never see the difference in interface.
    pub async fn load_index(&self) -> Arc<DictionaryIndex> {
        self.index
            .get_or_init(|| async {
                match self.fetch_index().await {
                    Ok(index) => Arc::new(index),
                    Err(e) => {
                        log::warn!("Dictionary index unavailable, using legacy fallback: {e}");
                        let legacy = self.load_legacy().await;
                        Arc::new(index_from_legacy(&legacy))
                    }
                }
            })
            .await
            .clone()
    }

    async fn fetch_index(&self) -> Result<DictionaryIndex> {
        let bytes = self.fetcher.fetch_bytes(INDEX_PATH).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Load one chapter shard, memoized per `{book}_{chapter}`.
    pub async fn load_chapter(&self, book_abbrev: &str, chapter: u32) -> Arc<ChapterShard> {
        let book_key = book_key_for_abbrev(book_abbrev);
        let chapter_key = format!("{book_key}_{chapter}");

        let cell = {
            let mut map = self.chapters.lock().expect("chapter cache poisoned");
            map.entry(chapter_key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_init(|| self.fetch_chapter(book_key, chapter, chapter_key))
            .await
            .clone()
    }

    async fn fetch_chapter(
        &self,
        book_key: String,
        chapter: u32,
        chapter_key: String,
    ) -> Arc<ChapterShard> {
        let index = self.load_index().await;

        if let Some(meta) = index.chapters.get(&chapter_key) {
            if !meta.path.is_empty() {
                match self.fetch_shard(&meta.path).await {
                    Ok(shard) => return Arc::new(shard),
                    Err(e) => {
                        log::warn!(
                            "Failed to load shard {chapter_key}, using legacy fallback: {e}"
                        );
                    }
                }
            }
        }

        let legacy = self.load_legacy().await;
        let prefix = format!("{book_key}_{chapter}_");
        let filtered: ChapterShard = legacy
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();
        Arc::new(filtered)
    }

    async fn fetch_shard(&self, path: &str) -> Result<ChapterShard> {
        let bytes = self.fetcher.fetch_bytes(path).await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        Ok(sanitize_shard(value))
    }

    /// The legacy monolith, fetched at most once. A failed fetch yields an
    /// empty dictionary (and therefore empty chapters) rather than an error.
    async fn load_legacy(&self) -> Arc<ChapterShard> {
        self.legacy
            .get_or_init(|| async {
                match self.fetch_legacy().await {
                    Ok(shard) => Arc::new(shard),
                    Err(e) => {
                        log::error!("Failed to load legacy dictionary: {e}");
                        Arc::new(ChapterShard::new())
                    }
                }
            })
            .await
            .clone()
    }

    async fn fetch_legacy(&self) -> Result<ChapterShard> {
        let bytes = self.fetcher.fetch_bytes(LEGACY_DICTIONARY_PATH).await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        Ok(sanitize_shard(value))
    }

    /// Chapter shard plus the sorted keys matching the verse prefix
    /// `{book}_{chapter}_{verse}_`. The filtered list is memoized per
    /// `(chapter, prefix)` because verse renders recompute it constantly.
    pub async fn verse_entries(
        &self,
        book_abbrev: &str,
        chapter: u32,
        verse: u32,
    ) -> (Arc<ChapterShard>, Arc<Vec<String>>) {
        let book_key = book_key_for_abbrev(book_abbrev);
        let shard = self.load_chapter(book_abbrev, chapter).await;

        let prefix = format!("{book_key}_{chapter}_{verse}_");
        let cache_key = format!("{book_key}_{chapter}:{prefix}");

        let keys = {
            let mut map = self.verse_keys.lock().expect("verse key cache poisoned");
            if let Some(keys) = map.get(&cache_key) {
                keys.clone()
            } else {
                let mut keys: Vec<String> = shard
                    .keys()
                    .filter(|key| key.starts_with(&prefix))
                    .cloned()
                    .collect();
                keys.sort_unstable();
                let keys = Arc::new(keys);
                map.insert(cache_key, keys.clone());
                keys
            }
        };

        (shard, keys)
    }
}

/// Synthesize an index from the legacy monolith's keys so that callers of
/// [`DictionaryLoader::load_index`] get the same shape either way.
fn index_from_legacy(legacy: &ChapterShard) -> DictionaryIndex {
    use super::key::DictionaryKey;
    use std::collections::BTreeMap;

    let mut books: BTreeMap<String, IndexBook> = BTreeMap::new();
    let mut chapters: BTreeMap<String, IndexChapter> = BTreeMap::new();

    for key in legacy.keys() {
        let parsed = match DictionaryKey::parse(key) {
            Some(parsed) => parsed,
            None => continue,
        };

        let book = books.entry(parsed.book_key.clone()).or_default();
        if !book.chapters.contains(&parsed.chapter) {
            book.chapters.push(parsed.chapter);
        }
        book.entry_count += 1;

        let meta = chapters.entry(parsed.chapter_key()).or_insert_with(|| IndexChapter {
            path: format!(
                "/data/dictionary/chapters/{}/{}.json",
                parsed.book_key, parsed.chapter
            ),
            entry_count: 0,
            size: 0,
        });
        meta.entry_count += 1;
    }

    for book in books.values_mut() {
        book.chapters.sort_unstable();
    }

    let now = chrono::Utc::now().to_rfc3339();
    DictionaryIndex {
        version: format!("legacy-{now}"),
        generated_at: now,
        total_entries: legacy.len(),
        total_books: books.len(),
        total_chapters: chapters.len(),
        dictionary_hash: "legacy-fallback".to_string(),
        books,
        chapters,
    }
}
