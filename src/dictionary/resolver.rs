//! Single-entry resolver for an explicitly selected word.
//!
//! Resolution runs in strict tiers: exact key, then normalization variants
//! of the selected word, then fuzzy matching against the verse's own keys.
//! Earlier tiers always win; fuzzy matching never shadows an exact entry.

use super::fetch::ShardFetcher;
use super::key::{book_key_for_abbrev, DictionaryKey};
use super::loader::DictionaryLoader;
use super::models::DictionaryEntry;
use super::normalize::strip_diacritics;

/// Maximum edit distance the fuzzy tier tolerates.
const MAX_EDIT_DISTANCE: usize = 2;

/// Normalization variants tried, in order, when the exact key misses.
const VARIANTS: [fn(&str) -> String; 4] = [
    lowercase_trimmed,
    accent_stripped,
    singularized,
    letters_only,
];

fn lowercase_trimmed(word: &str) -> String {
    word.trim().to_lowercase()
}

fn accent_stripped(word: &str) -> String {
    strip_diacritics(word.trim())
}

fn singularized(word: &str) -> String {
    let lowered = word.trim().to_lowercase();
    lowered.strip_suffix('s').unwrap_or(&lowered).to_string()
}

fn letters_only(word: &str) -> String {
    word.to_lowercase()
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect()
}

/// Resolve the dictionary entry for `word` at a verse position, or `None`
/// if no tier produces a match.
pub async fn get_entry<F: ShardFetcher>(
    loader: &DictionaryLoader<F>,
    book_abbrev: &str,
    chapter: u32,
    verse: u32,
    word: &str,
) -> Option<DictionaryEntry> {
    let (shard, verse_keys) = loader.verse_entries(book_abbrev, chapter, verse).await;

    // Tier 1: exact key from the word as selected.
    let exact = DictionaryKey::for_word(book_abbrev, chapter, verse, word).to_string();
    if let Some(entry) = shard.get(&exact) {
        return Some(entry.clone());
    }

    // Tier 2: normalization variants, in order.
    for variant in VARIANTS {
        let candidate = variant(word);
        if candidate.is_empty() {
            continue;
        }
        let key = DictionaryKey::for_word(book_abbrev, chapter, verse, &candidate).to_string();
        if let Some(entry) = shard.get(&key) {
            return Some(entry.clone());
        }
    }

    // Tier 3: fuzzy against the verse's keys. Keys are sorted, so the
    // first hit is stable across runs.
    let book_key = book_key_for_abbrev(book_abbrev);
    let prefix = format!("{book_key}_{chapter}_{verse}_");
    let search = strip_diacritics(word.trim());
    if search.is_empty() {
        return None;
    }

    for key in verse_keys.iter() {
        let dict_word = key
            .strip_prefix(&prefix)
            .unwrap_or(key)
            .replace('_', " ");
        if dict_word.contains(&search)
            || search.contains(&dict_word)
            || strsim::levenshtein(&dict_word, &search) <= MAX_EDIT_DISTANCE
        {
            log::debug!("Fuzzy-resolved '{word}' to '{key}'");
            return shard.get(key).cloned();
        }
    }

    None
}

/// Whether any entry exists for `word` at this verse position.
pub async fn has_entry<F: ShardFetcher>(
    loader: &DictionaryLoader<F>,
    book_abbrev: &str,
    chapter: u32,
    verse: u32,
    word: &str,
) -> bool {
    get_entry(loader, book_abbrev, chapter, verse, word)
        .await
        .is_some()
}
