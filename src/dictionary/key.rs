//! Dictionary key parsing and book-name mapping.
//!
//! Every entry in the dictionary is addressed by a composite key
//! `{book}_{chapter}_{verse}_{token}` where `book` is the full
//! ASCII-lowercased, diacritic-free book name (`genesis`, `1samuel`, ...).
//! The reading UI works with short book abbreviations (`gn`, `1sm`, ...),
//! so lookups map abbreviations to dictionary book keys first.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::normalize::word_to_token;

/// Strong lexical codes: `H####` (Hebrew) or `G####` (Greek).
static STRONG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[HG]\d+$").expect("valid regex"));

/// Returns true if `code` is a well-formed Strong code.
pub fn is_valid_strong(code: &str) -> bool {
    STRONG_RE.is_match(code)
}

/// Composite identity of a dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DictionaryKey {
    pub book_key: String,
    pub chapter: u32,
    pub verse: u32,
    pub token: String,
}

impl DictionaryKey {
    /// Parse a raw key string. Malformed keys (fewer than four segments,
    /// non-numeric or zero chapter/verse, empty book) are rejected, never
    /// coerced.
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split('_').collect();
        if parts.len() < 4 {
            return None;
        }

        let book_key = parts[0];
        if book_key.is_empty() {
            return None;
        }

        let chapter: u32 = parts[1].parse().ok()?;
        let verse: u32 = parts[2].parse().ok()?;
        if chapter == 0 || verse == 0 {
            return None;
        }

        // The token itself may contain underscores.
        Some(Self {
            book_key: book_key.to_string(),
            chapter,
            verse,
            token: parts[3..].join("_"),
        })
    }

    /// Build the key for an explicitly selected word, normalizing the word
    /// into its token form.
    pub fn for_word(book_abbrev: &str, chapter: u32, verse: u32, word: &str) -> Self {
        Self {
            book_key: book_key_for_abbrev(book_abbrev),
            chapter,
            verse,
            token: word_to_token(word),
        }
    }

    /// The `{book}_{chapter}` grouping key used for shard caching.
    pub fn chapter_key(&self) -> String {
        format!("{}_{}", self.book_key, self.chapter)
    }
}

impl fmt::Display for DictionaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.book_key, self.chapter, self.verse, self.token
        )
    }
}

/// Map a reading-UI book abbreviation to the dictionary's book key.
/// Unknown abbreviations pass through lowercased, so callers holding a full
/// book key can use it directly.
pub fn book_key_for_abbrev(abbrev: &str) -> String {
    let normalized = abbrev.to_ascii_lowercase();
    let mapped = match normalized.as_str() {
        "gn" => "genesis",
        "ex" => "exodo",
        "lv" => "levitico",
        "nm" => "numeros",
        "dt" => "deuteronomio",
        "js" => "josue",
        "jz" => "juizes",
        "rt" => "rute",
        "1sm" => "1samuel",
        "2sm" => "2samuel",
        "1rs" => "1reis",
        "2rs" => "2reis",
        "1cr" => "1cronicas",
        "2cr" => "2cronicas",
        "ed" => "esdras",
        "ne" => "neemias",
        "et" => "ester",
        "job" => "jo",
        "sl" => "salmos",
        "pv" => "proverbios",
        "ec" => "eclesiastes",
        "ct" => "cantares",
        "is" => "isaias",
        "jr" => "jeremias",
        "lm" => "lamentacoes",
        "ez" => "ezequiel",
        "dn" => "daniel",
        "os" => "oseias",
        "jl" => "joel",
        "am" => "amos",
        "ob" => "obadias",
        "jn" => "jonas",
        "mq" => "miqueias",
        "na" => "naum",
        "hc" => "habacuque",
        "sf" => "sofonias",
        "ag" => "ageu",
        "zc" => "zacarias",
        "ml" => "malaquias",
        "mt" => "mateus",
        "mc" => "marcos",
        "lc" => "lucas",
        "jo" => "joao",
        "at" => "atos",
        "rm" => "romanos",
        "1co" => "1corintios",
        "2co" => "2corintios",
        "gl" => "galatas",
        "ef" => "efesios",
        "fp" => "filipenses",
        "cl" => "colossenses",
        "1ts" => "1tessalonicenses",
        "2ts" => "2tessalonicenses",
        "1tm" => "1timoteo",
        "2tm" => "2timoteo",
        "tt" => "tito",
        "fm" => "filemom",
        "hb" => "hebreus",
        "tg" => "tiago",
        "1pe" => "1pedro",
        "2pe" => "2pedro",
        "1jo" => "1joao",
        "2jo" => "2joao",
        "3jo" => "3joao",
        "jd" => "judas",
        "ap" => "apocalipse",
        _ => return normalized,
    };
    mapped.to_string()
}
