//! Verse word matcher: finds every lexical occurrence in a verse.
//!
//! Matching is accent- and case-insensitive and tolerates a small class of
//! Portuguese inflectional suffixes (`s|es|ns|m|ens`). That class is a
//! deliberate heuristic, not morphology; its exact boundary is user-visible
//! behavior and must not be "improved" casually.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;

use super::fetch::ShardFetcher;
use super::key::book_key_for_abbrev;
use super::loader::DictionaryLoader;
use super::models::DictionaryEntry;
use super::normalize::{normalize_term, NormalizedText};

/// Compiled term patterns, shared across calls. Terms repeat heavily
/// between renders of the same chapter, and matching runs on every verse
/// render, so compilation must not.
static TERM_REGEXES: Lazy<Mutex<HashMap<String, Regex>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn term_regex(term: &str) -> Option<Regex> {
    let mut cache = TERM_REGEXES.lock().expect("term regex cache poisoned");
    if let Some(regex) = cache.get(term) {
        return Some(regex.clone());
    }
    let pattern = format!(r"\b{}(?:s|es|ns|m|ens)?\b", regex::escape(term));
    match Regex::new(&pattern) {
        Ok(regex) => {
            cache.insert(term.to_string(), regex.clone());
            Some(regex)
        }
        Err(e) => {
            log::debug!("Skipping unmatchable term '{term}': {e}");
            None
        }
    }
}

/// One highlightable occurrence in a verse.
#[derive(Debug, Clone, PartialEq)]
pub struct VerseMatch {
    /// Surface text exactly as it appears in the verse (case and accents
    /// preserved), including any tolerated suffix.
    pub word: String,
    pub entry: DictionaryEntry,
    /// Character index of the occurrence in the original verse text.
    pub index: usize,
}

/// Find all dictionary occurrences in `verse_text`, sorted ascending by
/// `index`. Callers rely on that order to render non-overlapping inline
/// spans without re-sorting.
pub async fn find_words_in_verse<F: ShardFetcher>(
    loader: &DictionaryLoader<F>,
    book_abbrev: &str,
    chapter: u32,
    verse: u32,
    verse_text: &str,
) -> Vec<VerseMatch> {
    let (shard, verse_keys) = loader.verse_entries(book_abbrev, chapter, verse).await;
    if verse_keys.is_empty() {
        return Vec::new();
    }

    let book_key = book_key_for_abbrev(book_abbrev);
    let prefix = format!("{book_key}_{chapter}_{verse}_");
    let normalized = NormalizedText::new(verse_text);

    let mut seen: HashSet<(String, usize)> = HashSet::new();
    let mut found = Vec::new();

    for key in verse_keys.iter() {
        let entry = match shard.get(key) {
            Some(entry) => entry,
            None => continue,
        };

        let key_word = key
            .strip_prefix(&prefix)
            .unwrap_or(key)
            .replace('_', " ");

        for term in search_terms(entry, &key_word) {
            let Some(regex) = term_regex(&term) else {
                continue;
            };

            for m in regex.find_iter(&normalized.text) {
                if !seen.insert((key.clone(), m.start())) {
                    continue;
                }
                let (start, end) = normalized.original_range(m.start(), m.end());
                found.push(VerseMatch {
                    word: verse_text[start..end].to_string(),
                    entry: entry.clone(),
                    index: verse_text[..start].chars().count(),
                });
            }
        }
    }

    found.sort_by_key(|m| m.index);
    found
}

/// Search terms for one entry: display term and key token, split on `/` to
/// support synonym sets, normalized, deduplicated, longest first so the
/// most specific term wins on overlapping spans.
fn search_terms(entry: &DictionaryEntry, key_word: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for raw in [entry.palavra_pt.as_str(), key_word] {
        for variant in raw.split('/') {
            let term = normalize_term(variant);
            if term.chars().count() >= 2 && !terms.contains(&term) {
                terms.push(term);
            }
        }
    }
    terms.sort_by_key(|t| std::cmp::Reverse(t.len()));
    terms
}

/// All dictionary tokens available for one verse, with underscores restored
/// to spaces (used by the UI to list tappable words).
pub async fn available_words_for_verse<F: ShardFetcher>(
    loader: &DictionaryLoader<F>,
    book_abbrev: &str,
    chapter: u32,
    verse: u32,
) -> Vec<String> {
    let book_key = book_key_for_abbrev(book_abbrev);
    let prefix = format!("{book_key}_{chapter}_{verse}_");
    let (_, verse_keys) = loader.verse_entries(book_abbrev, chapter, verse).await;

    verse_keys
        .iter()
        .map(|key| key.strip_prefix(&prefix).unwrap_or(key).replace('_', " "))
        .collect()
}
