//! Shard builder: splits the flat dictionary into per-chapter files plus a
//! content-addressed index.
//!
//! Runs offline (build time). The output directory is fully replaced on
//! every run so no stale shard can survive a content change. The index
//! `version` derives from a SHA-256 hash of the canonically serialized
//! input, so identical input always yields an identical version.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::error::{DictionaryError, Result};
use super::key::DictionaryKey;
use super::models::{validate_entry, DictionaryEntry, DictionaryIndex, IndexBook, IndexChapter};

/// Outcome of one build run.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub version: String,
    pub dictionary_hash: String,
    pub total_entries: usize,
    pub total_books: usize,
    pub total_chapters: usize,
    /// Keys that did not parse as `{book}_{chapter}_{verse}_{token}`.
    pub skipped_keys: usize,
    /// Values that failed entry validation.
    pub dropped_entries: usize,
    /// Audit: entries whose Strong code is not `[HG]\d+`.
    pub invalid_strong: usize,
    /// Audit: entries with fewer than 2 or more than 5 references.
    pub reference_violations: usize,
}

/// Build-time shard writer.
pub struct ShardBuilder {
    /// Prefix prepended to shard paths in the index, matching where the
    /// artifact tree is mounted at runtime.
    pub public_prefix: String,
}

impl Default for ShardBuilder {
    fn default() -> Self {
        Self {
            public_prefix: "/data/dictionary".to_string(),
        }
    }
}

impl ShardBuilder {
    pub fn new(public_prefix: impl Into<String>) -> Self {
        let mut public_prefix = public_prefix.into();
        while public_prefix.ends_with('/') {
            public_prefix.pop();
        }
        Self { public_prefix }
    }

    /// Read the flat dictionary at `input`, shard it into `out_dir` and
    /// write the index. `out_dir` is deleted and recreated.
    pub fn build(&self, input: &Path, out_dir: &Path) -> Result<BuildReport> {
        let raw = fs::read(input)?;
        // Tolerate a UTF-8 BOM in hand-edited source files.
        let raw = raw.strip_prefix(b"\xef\xbb\xbf").unwrap_or(&raw);
        let value: serde_json::Value = serde_json::from_slice(raw)?;
        let source = match value {
            serde_json::Value::Object(map) => map,
            _ => {
                return Err(DictionaryError::build(
                    "source dictionary must be a JSON object of key -> entry",
                ))
            }
        };

        let mut entries: BTreeMap<String, DictionaryEntry> = BTreeMap::new();
        let mut skipped_keys = 0usize;
        let mut dropped_entries = 0usize;

        for (key, raw_entry) in source {
            let entry = match validate_entry(raw_entry) {
                Ok(entry) => entry,
                Err(reason) => {
                    dropped_entries += 1;
                    log::warn!("Dropping entry '{key}': {reason}");
                    continue;
                }
            };
            if DictionaryKey::parse(&key).is_none() {
                skipped_keys += 1;
                log::warn!("Skipping malformed dictionary key '{key}'");
                continue;
            }
            entries.insert(key, entry);
        }

        let dictionary_hash = hash_entries(&entries)?;
        let version = format!("dict-{}", &dictionary_hash[..12]);
        let generated_at = chrono::Utc::now().to_rfc3339();

        // Group by (book, chapter). BTreeMaps keep the whole build
        // deterministic, including file write order.
        let mut shards: BTreeMap<String, BTreeMap<String, DictionaryEntry>> = BTreeMap::new();
        let mut books: BTreeMap<String, IndexBook> = BTreeMap::new();
        let mut invalid_strong = 0usize;
        let mut reference_violations = 0usize;
        let total_entries = entries.len();

        for (key, entry) in entries {
            let parsed = DictionaryKey::parse(&key).expect("keys validated above");

            if !entry.has_valid_strong() {
                invalid_strong += 1;
            }
            let refs = entry.referencias_relacionadas.len();
            if !(2..=5).contains(&refs) {
                reference_violations += 1;
            }

            let book = books.entry(parsed.book_key.clone()).or_default();
            if !book.chapters.contains(&parsed.chapter) {
                book.chapters.push(parsed.chapter);
            }
            book.entry_count += 1;

            shards
                .entry(parsed.chapter_key())
                .or_default()
                .insert(key, entry);
        }

        for book in books.values_mut() {
            book.chapters.sort_unstable();
        }

        if invalid_strong > 0 {
            log::warn!("Audit: {invalid_strong} entries with malformed Strong codes");
        }
        if reference_violations > 0 {
            log::warn!("Audit: {reference_violations} entries with reference counts outside 2-5");
        }

        // Replace the output tree wholesale.
        if out_dir.exists() {
            fs::remove_dir_all(out_dir)?;
        }
        fs::create_dir_all(out_dir.join("chapters"))?;

        let mut chapter_meta: BTreeMap<String, IndexChapter> = BTreeMap::new();
        for (chapter_key, shard) in &shards {
            let (book_key, chapter) = chapter_key
                .rsplit_once('_')
                .ok_or_else(|| DictionaryError::build(format!("bad chapter key {chapter_key}")))?;

            let relative = format!("chapters/{book_key}/{chapter}.json");
            let absolute = out_dir.join(&relative);
            if let Some(parent) = absolute.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&absolute, serde_json::to_vec(shard)?)?;

            let size = fs::metadata(&absolute)?.len();
            chapter_meta.insert(
                chapter_key.clone(),
                IndexChapter {
                    path: format!("{}/{}", self.public_prefix, relative),
                    entry_count: shard.len(),
                    size,
                },
            );
        }

        let index = DictionaryIndex {
            version: version.clone(),
            generated_at,
            total_entries,
            total_books: books.len(),
            total_chapters: chapter_meta.len(),
            dictionary_hash: dictionary_hash.clone(),
            books,
            chapters: chapter_meta,
        };

        fs::write(out_dir.join("index.json"), serde_json::to_vec_pretty(&index)?)?;

        log::info!(
            "Built {} shards, {} entries, version {}",
            index.total_chapters,
            index.total_entries,
            index.version
        );

        Ok(BuildReport {
            version,
            dictionary_hash,
            total_entries,
            total_books: index.total_books,
            total_chapters: index.total_chapters,
            skipped_keys,
            dropped_entries,
            invalid_strong,
            reference_violations,
        })
    }
}

/// SHA-256 over the canonical (sorted-key, compact) serialization of the
/// validated input. Records rejected during validation do not contribute:
/// two inputs differing only in invalid records share a hash and version,
/// which is intended — the published shard set is identical.
fn hash_entries(entries: &BTreeMap<String, DictionaryEntry>) -> Result<String> {
    let canonical = serde_json::to_vec(entries)?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}
